//! Server configuration value objects.

use super::{ServerName, SupervisorDomainError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Launch settings for a provider spawned as a local subprocess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubprocessConfig {
    command: String,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    working_directory: Option<String>,
}

impl SubprocessConfig {
    /// Creates a new subprocess configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::EmptyCommand`] when `command` is empty
    /// after trimming.
    pub fn new(command: impl Into<String>) -> Result<Self, SupervisorDomainError> {
        let normalized_command = command.into().trim().to_owned();
        if normalized_command.is_empty() {
            return Err(SupervisorDomainError::EmptyCommand);
        }

        Ok(Self {
            command: normalized_command,
            args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
        })
    }

    /// Replaces command-line arguments.
    #[must_use]
    pub fn with_args<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = values.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces environment overrides.
    ///
    /// Overrides are merged over the supervisor's own environment at launch.
    #[must_use]
    pub fn with_env(mut self, values: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = values.into_iter().collect();
        self
    }

    /// Sets an explicit working directory.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::EmptyWorkingDirectory`] when the
    /// provided value is empty after trimming.
    pub fn with_working_directory(
        mut self,
        value: impl Into<String>,
    ) -> Result<Self, SupervisorDomainError> {
        let normalized = value.into().trim().to_owned();
        if normalized.is_empty() {
            return Err(SupervisorDomainError::EmptyWorkingDirectory);
        }

        self.working_directory = Some(normalized);
        Ok(self)
    }

    /// Returns the executable command.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Returns command-line arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Returns environment overrides.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Returns the optional working directory.
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }
}

/// Settings for a provider reachable over HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteHttpConfig {
    url: String,
    headers: BTreeMap<String, String>,
}

impl RemoteHttpConfig {
    /// Creates a new remote HTTP configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError`] when `url` is empty or does not start
    /// with `http://` or `https://`.
    pub fn new(url: impl Into<String>) -> Result<Self, SupervisorDomainError> {
        let normalized_url = url.into().trim().to_owned();
        if normalized_url.is_empty() {
            return Err(SupervisorDomainError::EmptyUrl);
        }

        let has_valid_prefix =
            normalized_url.starts_with("http://") || normalized_url.starts_with("https://");
        if !has_valid_prefix {
            return Err(SupervisorDomainError::InvalidUrl(normalized_url));
        }

        Ok(Self {
            url: normalized_url,
            headers: BTreeMap::new(),
        })
    }

    /// Adds a request header sent with every health probe.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError::EmptyHeaderName`] when `name` is empty
    /// after trimming.
    pub fn with_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<Self, SupervisorDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(SupervisorDomainError::EmptyHeaderName);
        }

        self.headers.insert(normalized_name, value.into());
        Ok(self)
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Returns request headers.
    #[must_use]
    pub const fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Supported provider kinds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "config")]
pub enum ServerKind {
    /// Provider spawned locally and spoken to over standard I/O.
    Subprocess(SubprocessConfig),
    /// Provider reachable over HTTP; nothing is spawned.
    RemoteHttp(RemoteHttpConfig),
}

/// Immutable descriptor of one supervised server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    name: ServerName,
    kind: ServerKind,
    startup_record: bool,
}

impl ServerConfig {
    /// Creates a server configuration.
    #[must_use]
    pub const fn new(name: ServerName, kind: ServerKind) -> Self {
        Self {
            name,
            kind,
            startup_record: false,
        }
    }

    /// Creates a subprocess server configuration.
    #[must_use]
    pub const fn subprocess(name: ServerName, config: SubprocessConfig) -> Self {
        Self::new(name, ServerKind::Subprocess(config))
    }

    /// Creates a remote HTTP server configuration.
    #[must_use]
    pub const fn remote_http(name: ServerName, config: RemoteHttpConfig) -> Self {
        Self::new(name, ServerKind::RemoteHttp(config))
    }

    /// Marks the server as one whose launches are journalled to its source
    /// file, for providers that never write one themselves.
    #[must_use]
    pub const fn with_startup_record(mut self) -> Self {
        self.startup_record = true;
        self
    }

    /// Returns the server name.
    #[must_use]
    pub const fn name(&self) -> &ServerName {
        &self.name
    }

    /// Returns the kind-specific settings.
    #[must_use]
    pub const fn kind(&self) -> &ServerKind {
        &self.kind
    }

    /// Returns whether launches are journalled to the server's source file.
    #[must_use]
    pub const fn records_startup(&self) -> bool {
        self.startup_record
    }
}
