//! Outbound HTTP plumbing shared by the backend proxy and the RPC client
//!
//! Each exchange builds its own client: no connection pool, no redirect
//! following, and one deadline covering connect, headers and body. Bodies
//! are read chunk by chunk against a byte ceiling.

use axum::body::Bytes;
use reqwest::{header::HeaderMap, redirect::Policy, RequestBuilder, StatusCode};
use std::time::Duration;
use thiserror::Error;

use crate::utils::constants::{MAX_UPSTREAM_BODY_BYTES, USER_AGENT};

/// Transport-level failure of one exchange
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("deadline of {0:?} elapsed")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Unreachable(String),
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),
}

/// Fully buffered upstream response
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RawResponse {
    pub fn content_type(&self) -> &str {
        self.headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

/// HTTP client with redirects disabled and pooling off
pub fn build_client() -> Result<reqwest::Client, TransportError> {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .pool_max_idle_per_host(0)
        .user_agent(USER_AGENT)
        .gzip(true)
        .build()
        .map_err(|e| TransportError::Unreachable(format!("failed to build HTTP client: {e}")))
}

/// Send `request` and buffer the body, all under `deadline`.
///
/// The timer is dropped on every exit path; an elapsed deadline cancels the
/// in-flight future so no partial response is observed.
pub async fn exchange(request: RequestBuilder, deadline: Duration) -> Result<RawResponse, TransportError> {
    exchange_limited(request, deadline, MAX_UPSTREAM_BODY_BYTES).await
}

/// [`exchange`] with an explicit body ceiling
pub async fn exchange_limited(
    request: RequestBuilder,
    deadline: Duration,
    max_body: usize,
) -> Result<RawResponse, TransportError> {
    let transport = |e: reqwest::Error| {
        if e.is_timeout() {
            TransportError::Timeout(deadline)
        } else {
            TransportError::Unreachable(e.to_string())
        }
    };

    let call = async {
        let mut response = request.send().await.map_err(transport)?;
        if response.content_length().is_some_and(|len| len > max_body as u64) {
            return Err(TransportError::BodyTooLarge(max_body));
        }

        let status = response.status();
        let headers = response.headers().clone();
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport)? {
            if body.len() + chunk.len() > max_body {
                return Err(TransportError::BodyTooLarge(max_body));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(RawResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    };

    tokio::time::timeout(deadline, call)
        .await
        .unwrap_or(Err(TransportError::Timeout(deadline)))
}
