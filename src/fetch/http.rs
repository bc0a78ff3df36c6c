//! HTTP page fetcher with retry and backoff.

use std::time::Duration;

use anyhow::{Context, Result};
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use tracing::{debug, error, warn};

use super::Fetcher;
use crate::config::FetchConfig;

pub struct HttpFetcher {
    client: Client,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Sleep before retry number `attempt`, honouring `Retry-After` when the
    /// server sent one.
    async fn wait(&self, url: &str, attempt: u32, headers: Option<&HeaderMap>) {
        let delay = headers
            .and_then(retry_after)
            .unwrap_or_else(|| self.config.backoff(attempt));
        warn!(
            "Retrying {} (attempt {}/{}) in {:.1}s",
            url,
            attempt,
            self.config.max_retries,
            delay.as_secs_f64()
        );
        tokio::time::sleep(delay).await;
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        let mut attempt = 0;
        loop {
            let response = match self.client.get(url).send().await {
                Ok(response) => response,
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    debug!("Request to {} failed: {}", url, e);
                    self.wait(url, attempt, None).await;
                    continue;
                }
                Err(e) => {
                    error!("Error during requests to {} : {}", url, e);
                    return None;
                }
            };

            let status = response.status().as_u16();
            if self.config.is_retryable(status) && attempt < self.config.max_retries {
                attempt += 1;
                self.wait(url, attempt, Some(response.headers())).await;
                continue;
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            if !is_good_response(status, content_type.as_deref()) {
                warn!(
                    "Unusable response from {}: status {}, content type {:?}",
                    url, status, content_type
                );
                return None;
            }

            return match response.bytes().await {
                Ok(body) => Some(to_utf8(&body, content_type.as_deref())),
                Err(e) => {
                    error!("Error reading body from {} : {}", url, e);
                    None
                }
            };
        }
    }
}

/// True for a 200 response that looks like HTML.
fn is_good_response(status: u16, content_type: Option<&str>) -> bool {
    status == 200
        && content_type
            .map(|ct| ct.to_lowercase().contains("html"))
            .unwrap_or(false)
}

/// Re-encode the body as UTF-8 when the `Content-Type` header declares
/// another charset. Bodies without a usable declaration are left alone.
fn to_utf8(body: &[u8], content_type: Option<&str>) -> Vec<u8> {
    let encoding = content_type
        .and_then(header_charset)
        .and_then(|label| Encoding::for_label(label.as_bytes()));
    match encoding {
        Some(encoding) if encoding != UTF_8 => {
            debug!("Transcoding body from {}", encoding.name());
            encoding.decode(body).0.into_owned().into_bytes()
        }
        _ => body.to_vec(),
    }
}

fn header_charset(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}

/// `Retry-After` given in seconds. HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs: u64 = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse().ok()?;
    Some(Duration::from_secs(secs))
}
