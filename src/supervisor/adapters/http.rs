//! HTTP probe backed by `reqwest`.

use crate::supervisor::{
    domain::RemoteHttpConfig,
    ports::{HttpProbe, HttpProbeError, HttpProbeResult},
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Probes remote providers with a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestHttpProbe {
    client: Client,
}

impl ReqwestHttpProbe {
    /// Creates a probe whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`HttpProbeError::Transport`] when the client cannot be built.
    pub fn new(timeout: Duration) -> HttpProbeResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(HttpProbeError::transport)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpProbe for ReqwestHttpProbe {
    async fn get(&self, config: &RemoteHttpConfig) -> HttpProbeResult<u16> {
        let request = config
            .headers()
            .iter()
            .fold(self.client.get(config.url()), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            });

        let response = request.send().await.map_err(|err| {
            if err.is_timeout() {
                HttpProbeError::Timeout
            } else if err.is_connect() {
                HttpProbeError::connect(err)
            } else {
                HttpProbeError::transport(err)
            }
        })?;
        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("listener has an address");
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buffer = [0_u8; 1024];
                let _read = socket.read(&mut buffer).await;
                let _written = socket.write_all(response.as_bytes()).await;
            }
        });
        format!("http://{address}/health")
    }

    #[tokio::test]
    async fn returns_status_code_and_sends_headers() {
        let url = serve_once("HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\n\r\n").await;
        let probe = ReqwestHttpProbe::new(Duration::from_secs(5)).expect("client builds");
        let config = RemoteHttpConfig::new(url)
            .and_then(|config| config.with_header("Authorization", "Bearer token"))
            .expect("valid config");

        let status = probe.get(&config).await.expect("probe should answer");

        assert_eq!(status, 401);
    }

    #[tokio::test]
    async fn refused_connection_is_reported() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("listener has an address");
        drop(listener);
        let probe = ReqwestHttpProbe::new(Duration::from_secs(5)).expect("client builds");
        let config = RemoteHttpConfig::new(format!("http://{address}/")).expect("valid config");

        let result = probe.get(&config).await;

        assert!(matches!(
            result,
            Err(HttpProbeError::Connect(_) | HttpProbeError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("listener should bind");
        let address = listener.local_addr().expect("listener has an address");
        tokio::spawn(async move {
            let accepted = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(accepted);
        });
        let probe = ReqwestHttpProbe::new(Duration::from_millis(200)).expect("client builds");
        let config = RemoteHttpConfig::new(format!("http://{address}/")).expect("valid config");

        let result = probe.get(&config).await;

        assert!(matches!(result, Err(HttpProbeError::Timeout)));
    }
}
