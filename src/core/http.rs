use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::core::downloader::Transport;
use crate::core::error::{StageError, StageResult};

const APP_USER_AGENT: &str = concat!("nativestage/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .timeout(timeout)
        .build()
}

/// `Transport` over a shared reqwest client.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> StageResult<Self> {
        let client = build_http_client(timeout)
            .map_err(|e| StageError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

fn check_status(url: &str, status: StatusCode) -> StageResult<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(StageError::NotFound {
            url: url.to_string(),
        });
    }
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(StageError::NetworkUnavailable {
            url: url.to_string(),
            reason: format!("HTTP {}", status.as_u16()),
        });
    }
    if !status.is_success() {
        return Err(StageError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(())
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> StageResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        check_status(url, response.status())?;

        let bytes = response.bytes().await?;
        debug!("GET {} ({} bytes)", url, bytes.len());
        Ok(bytes.to_vec())
    }

    async fn exists(&self, url: &str) -> StageResult<bool> {
        let response = self.client.head(url).send().await?;
        let status = response.status();
        // Some repositories refuse HEAD; fall back to a full GET.
        if status == StatusCode::METHOD_NOT_ALLOWED {
            return match self.get(url).await {
                Ok(_) => Ok(true),
                Err(StageError::NotFound { .. }) => Ok(false),
                Err(e) => Err(e),
            };
        }
        match check_status(url, status) {
            Ok(()) => {
                debug!("HEAD {} ({})", url, status.as_u16());
                Ok(true)
            }
            Err(StageError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let url = "https://repo.test/a.jar";
        assert!(check_status(url, StatusCode::OK).is_ok());
        assert!(matches!(
            check_status(url, StatusCode::NOT_FOUND),
            Err(StageError::NotFound { .. })
        ));
        assert!(check_status(url, StatusCode::BAD_GATEWAY)
            .unwrap_err()
            .is_retryable());
        assert!(check_status(url, StatusCode::TOO_MANY_REQUESTS)
            .unwrap_err()
            .is_retryable());
        assert!(matches!(
            check_status(url, StatusCode::FORBIDDEN),
            Err(StageError::DownloadFailed { status: 403, .. })
        ));
    }
}
