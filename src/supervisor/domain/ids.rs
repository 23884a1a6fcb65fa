//! Identifier and validated-name types for supervised servers.

use super::SupervisorDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Maximum length for a server name.
const MAX_SERVER_NAME_LENGTH: usize = 100;

/// Unique identifier for one launch of a server.
///
/// Every (re)start mints a fresh identifier so exit notifications from a
/// previous launch can be told apart from the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(Uuid);

impl HandleId {
    /// Creates a new random handle identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Validated server name, the unique key of a server configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServerName(String);

impl ServerName {
    /// Creates a validated server name.
    ///
    /// The input is trimmed and lowercased. Only characters in `[a-z0-9-]`
    /// are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`SupervisorDomainError`] when validation fails.
    pub fn new(value: impl Into<String>) -> Result<Self, SupervisorDomainError> {
        let normalized = value.into().trim().to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(SupervisorDomainError::EmptyServerName);
        }

        let is_valid = normalized.chars().all(|character| {
            character.is_ascii_lowercase() || character.is_ascii_digit() || character == '-'
        });
        if !is_valid {
            return Err(SupervisorDomainError::InvalidServerName(normalized));
        }

        if normalized.len() > MAX_SERVER_NAME_LENGTH {
            return Err(SupervisorDomainError::ServerNameTooLong(normalized));
        }

        Ok(Self(normalized))
    }

    /// Returns the server name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the environment-variable form of the name.
    ///
    /// `postgres-flowise` becomes `POSTGRES_FLOWISE`.
    #[must_use]
    pub fn env_key(&self) -> String {
        self.0.to_ascii_uppercase().replace('-', "_")
    }
}

impl AsRef<str> for ServerName {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for ServerName {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("memory", "memory")]
    #[case("  Postgres-Flowise ", "postgres-flowise")]
    #[case("context7", "context7")]
    fn server_name_normalizes_valid_input(#[case] input: &str, #[case] expected: &str) {
        let name = ServerName::new(input).expect("name should be valid");
        assert_eq!(name.as_str(), expected);
    }

    #[rstest]
    #[case("", SupervisorDomainError::EmptyServerName)]
    #[case("   ", SupervisorDomainError::EmptyServerName)]
    #[case(
        "knowledge_graph",
        SupervisorDomainError::InvalidServerName("knowledge_graph".to_owned())
    )]
    fn server_name_rejects_invalid_input(
        #[case] input: &str,
        #[case] expected: SupervisorDomainError,
    ) {
        assert_eq!(ServerName::new(input), Err(expected));
    }

    #[test]
    fn server_name_rejects_overlong_input() {
        let long = "a".repeat(MAX_SERVER_NAME_LENGTH + 1);
        assert!(matches!(
            ServerName::new(long),
            Err(SupervisorDomainError::ServerNameTooLong(_))
        ));
    }

    #[test]
    fn every_launch_gets_a_distinct_handle_id() {
        let first = HandleId::new();
        let second = HandleId::default();
        assert_ne!(first, second);
        assert_eq!(first.to_string().len(), 36);
    }

    #[test]
    fn env_key_upper_cases_and_replaces_hyphens() {
        let name = ServerName::new("prisma-vuexy").expect("valid name");
        assert_eq!(name.env_key(), "PRISMA_VUEXY");
    }
}
