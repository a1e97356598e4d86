//! Plain HTTP download of rendered images.
//!
//! Render URLs are pre-signed, so no API token is sent with these requests.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};

use crate::application::fetch::FetchFailure;
use crate::application::ports::AssetDownloader;
use crate::infra::error::InfraError;

use super::transport::Transport;

#[derive(Clone, Debug)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(timeout: Duration) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(Transport::user_agent())
            .timeout(timeout)
            .build()
            .map_err(InfraError::HttpClient)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl AssetDownloader for HttpDownloader {
    async fn download(&self, url: &Url) -> Result<Bytes, FetchFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Status {
                status: status.as_u16(),
            });
        }

        let expected = response.content_length();
        let bytes = response.bytes().await.map_err(classify)?;
        let received = bytes.len() as u64;

        if let Some(expected) = expected.filter(|expected| *expected != received) {
            return Err(FetchFailure::Truncated { expected, received });
        }
        if bytes.is_empty() {
            return Err(FetchFailure::EmptyBody);
        }

        Ok(bytes)
    }
}

fn classify(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else {
        FetchFailure::network(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use httpmock::MockServer;

    use super::*;

    fn downloader(timeout: Duration) -> HttpDownloader {
        HttpDownloader::new(timeout).expect("downloader")
    }

    fn url(server: &MockServer, path: &str) -> Url {
        Url::parse(&server.url(path)).expect("url")
    }

    #[tokio::test]
    async fn successful_download_returns_the_body() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method("GET").path("/render/1.png");
            then.status(200)
                .header("content-type", "image/png")
                .body([0x89u8, b'P', b'N', b'G']);
        });

        let bytes = downloader(Duration::from_secs(5))
            .download(&url(&server, "/render/1.png"))
            .await
            .expect("bytes");

        mock.assert();
        assert_eq!(bytes.as_ref(), [0x89u8, b'P', b'N', b'G']);
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/render/expired.png");
            then.status(403).body("AccessDenied");
        });

        let err = downloader(Duration::from_secs(5))
            .download(&url(&server, "/render/expired.png"))
            .await
            .expect_err("forbidden");

        assert_eq!(err, FetchFailure::Status { status: 403 });
    }

    #[tokio::test]
    async fn empty_body_is_a_failure() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/render/empty.png");
            then.status(200);
        });

        let err = downloader(Duration::from_secs(5))
            .download(&url(&server, "/render/empty.png"))
            .await
            .expect_err("empty");

        assert_eq!(err, FetchFailure::EmptyBody);
    }

    #[tokio::test]
    async fn slow_responses_time_out() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method("GET").path("/render/slow.png");
            then.status(200)
                .body("late")
                .delay(Duration::from_millis(500));
        });

        let err = downloader(Duration::from_millis(100))
            .download(&url(&server, "/render/slow.png"))
            .await
            .expect_err("timeout");

        assert_eq!(err, FetchFailure::Timeout);
    }

    #[tokio::test]
    async fn unreachable_hosts_are_network_failures() {
        let url = Url::parse("http://127.0.0.1:9/render.png").expect("url");
        let err = downloader(Duration::from_secs(2))
            .download(&url)
            .await
            .expect_err("refused");

        assert!(matches!(err, FetchFailure::Network { .. }));
    }
}
