//! Read-only HTTP access to the test-execution platform.
//!
//! Every non-2xx status, connection failure and undecodable body is returned as
//! an error; nothing here retries.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use openqa_bisect_core::CLIENT_MARKER;
use serde::de::DeserializeOwned;

const ERROR_BODY_MAX_CHARS: usize = 800;

pub(crate) fn truncate_for_error(body: &str, max_chars: usize) -> String {
    if body.chars().count() <= max_chars {
        return body.to_string();
    }
    let mut truncated = body.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[derive(Debug, Clone)]
pub struct PlatformHttpClient {
    http: reqwest::blocking::Client,
}

impl PlatformHttpClient {
    pub fn new(request_timeout_ms: u64) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static(CLIENT_MARKER),
        );
        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms.max(1)))
            .build()
            .context("failed to create platform http client")?;
        Ok(Self { http })
    }

    fn get_success(&self, operation: &str, url: &str) -> Result<reqwest::blocking::Response> {
        tracing::debug!("fetching {operation} from {url}");
        let response = self
            .http
            .get(url)
            .send()
            .with_context(|| format!("{operation} request to {url} failed"))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "{operation} request to {url} failed with status {}: {}",
                status.as_u16(),
                truncate_for_error(&body, ERROR_BODY_MAX_CHARS)
            );
        }
        Ok(response)
    }

    pub fn fetch_text(&self, operation: &str, url: &str) -> Result<String> {
        self.get_success(operation, url)?
            .text()
            .with_context(|| format!("failed to read {operation} body from {url}"))
    }

    pub fn fetch_json<T>(&self, operation: &str, url: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let body = self.fetch_text(operation, url)?;
        serde_json::from_str(&body).with_context(|| {
            format!(
                "failed to decode {operation} from {url}: {}",
                truncate_for_error(&body, ERROR_BODY_MAX_CHARS)
            )
        })
    }
}
