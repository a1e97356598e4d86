//! Authenticated JSON transport for the REST API.

use std::time::{Duration, Instant};

use reqwest::header::HeaderValue;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::application::ports::TransportError;
use crate::infra::error::InfraError;

const TOKEN_HEADER: &str = "X-Figma-Token";
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Clone, Debug)]
pub struct Transport {
    client: Client,
    base: Url,
    token: HeaderValue,
}

impl Transport {
    pub fn new(base: Url, token: &str, timeout: Duration) -> Result<Self, InfraError> {
        if base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "API base URL `{base}` cannot carry a path"
            )));
        }

        let mut token = HeaderValue::from_str(token.trim())
            .map_err(|err| InfraError::configuration(format!("invalid API token: {err}")))?;
        token.set_sensitive(true);

        let client = Client::builder()
            .user_agent(Self::user_agent())
            .timeout(timeout)
            .build()
            .map_err(InfraError::HttpClient)?;

        Ok(Self {
            client,
            base,
            token,
        })
    }

    pub fn user_agent() -> &'static str {
        concat!("figport/", env!("CARGO_PKG_VERSION"))
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    pub fn url(&self, segments: &[&str]) -> Result<Url, TransportError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| TransportError::malformed("base URL cannot carry a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let mut url = self.url(segments)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }

        self.send(Method::GET, url, |request| request).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, TransportError> {
        let url = self.url(segments)?;
        self.send(Method::POST, url, |request| request.json(body))
            .await
    }

    async fn send<T, F>(&self, method: Method, url: Url, prepare: F) -> Result<T, TransportError>
    where
        T: DeserializeOwned,
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let path = url.path().to_string();
        let started = Instant::now();
        let request = self
            .client
            .request(method.clone(), url)
            .header(TOKEN_HEADER, self.token.clone());

        let response = prepare(request).send().await.map_err(request_error)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(request_error)?;

        debug!(
            target = "figport::http",
            method = %method,
            path = %path,
            status = status.as_u16(),
            bytes = bytes.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "api request finished"
        );

        handle(status, &bytes)
    }
}

fn handle<T: DeserializeOwned>(status: StatusCode, bytes: &[u8]) -> Result<T, TransportError> {
    if !status.is_success() {
        let body: String = String::from_utf8_lossy(bytes)
            .chars()
            .take(MAX_ERROR_BODY_CHARS)
            .collect();
        return Err(TransportError::Status {
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_slice(bytes)
        .map_err(|err| TransportError::malformed(format!("failed to parse body: {err}")))
}

fn request_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::connection(format!("request timed out: {err}"))
    } else {
        TransportError::connection(err.to_string())
    }
}
