use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DocsError;

/// Fixed attempt cap with a fixed pause between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_retries: usize,
    pub delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 2000,
        }
    }
}

impl RetryPolicy {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

pub fn build_client<E>(timeout: Duration, map_err: E) -> Result<Client, DocsError>
where
    E: Fn(String) -> DocsError,
{
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("gwas-docs/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| map_err(err.to_string()))?,
    );
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| map_err(err.to_string()))
}

/// Sends the request built by `make_req`, retrying retryable statuses and
/// transport errors. The final response is returned whatever its status.
pub fn send_with_retries<F, E>(
    policy: RetryPolicy,
    mut make_req: F,
    map_err: E,
) -> Result<Response, DocsError>
where
    F: FnMut() -> RequestBuilder,
    E: Fn(reqwest::Error) -> DocsError,
{
    let mut attempt = 0usize;
    loop {
        match make_req().send() {
            Ok(resp) => {
                let status = resp.status().as_u16();
                if attempt < policy.max_retries && is_retryable_status(status) {
                    debug!(status, attempt, "retrying request");
                    thread::sleep(policy.delay());
                    attempt += 1;
                    continue;
                }
                return Ok(resp);
            }
            Err(err) => {
                if attempt < policy.max_retries && is_retryable_error(&err) {
                    debug!(error = %err, attempt, "retrying request");
                    thread::sleep(policy.delay());
                    attempt += 1;
                    continue;
                }
                return Err(map_err(err));
            }
        }
    }
}

pub fn handle_status<E>(response: Response, to_error: E) -> Result<Response, DocsError>
where
    E: FnOnce(u16, String) -> DocsError,
{
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| "request failed".to_string());
    Err(to_error(status, message))
}

pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
