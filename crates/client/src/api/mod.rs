//! REST backend client.
//!
//! # Architecture
//!
//! - `reqwest` with a cookie jar; the backend authenticates by session cookie
//! - One module per backend area: `auth`, `designs`, `payments`, `profile`
//! - The image generator is a separate endpoint with its own in-memory cache
//!   (`moka`, 10 minute TTL) so repeating a prompt does not generate again
//! - Backend payloads are converted into core domain types in `conversions`
//!   before anything else sees them
//!
//! # Example
//!
//! ```rust,ignore
//! let api = ApiClient::new(&config)?;
//! let user = api.login(&email, "hunter22").await?;
//! let designs = api.list_designs().await?;
//! ```

mod auth;
pub mod conversions;
mod designs;
mod generate;
mod payments;
mod profile;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;

use moka::future::Cache;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{ClientConfig, GeneratorConfig};
use conversions::ConversionError;
use types::ErrorBody;

pub use generate::GENERATED_IMAGE_TTL;
pub use payments::{NewOrder, PaymentCompletion, PaymentOrder, PlacedOrder};

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never got a response (timeout, connection failure).
    #[error("network error: {0}")]
    Network(reqwest::Error),

    /// The session is missing or expired.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend rejected the input.
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        fields: BTreeMap<String, String>,
    },

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Too many requests.
    #[error("rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("backend returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body was not what the backend promised.
    #[error("invalid response: {0}")]
    Parse(String),

    /// A record in the response could not be normalized.
    #[error("invalid record: {0}")]
    Conversion(#[from] ConversionError),

    /// An endpoint URL could not be built.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e)
        }
    }
}

/// Client for the Kickforge REST backend.
///
/// Cheap to clone; clones share the connection pool, cookie jar and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cookies: Arc<Jar>,
    generator: GeneratorConfig,
    generated: Cache<String, String>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let cookies = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .timeout(config.request_timeout)
            .build()
            .map_err(ApiError::Network)?;

        let generated = Cache::builder()
            .max_capacity(100)
            .time_to_live(GENERATED_IMAGE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                cookies,
                generator: config.generator.clone(),
                generated,
            }),
        })
    }

    /// The backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Export the session cookies for the backend, if any are set.
    #[must_use]
    pub fn session_cookie(&self) -> Option<String> {
        self.inner
            .cookies
            .cookies(&self.inner.base_url)
            .and_then(|value| value.to_str().ok().map(ToOwned::to_owned))
    }

    /// Re-import cookies previously exported with [`Self::session_cookie`].
    pub fn restore_session_cookie(&self, cookie_header: &str) {
        for pair in cookie_header.split(';') {
            let pair = pair.trim();
            if !pair.is_empty() {
                self.inner
                    .cookies
                    .add_cookie_str(&format!("{pair}; Path=/"), &self.inner.base_url);
            }
        }
    }

    /// Expire every backend cookie in the jar.
    pub fn forget_session(&self) {
        let Some(header) = self.inner.cookies.cookies(&self.inner.base_url) else {
            return;
        };
        let Ok(header) = header.to_str() else {
            return;
        };
        for pair in header.split(';') {
            if let Some((name, _)) = pair.trim().split_once('=') {
                self.inner.cookies.add_cookie_str(
                    &format!("{name}=; Path=/; Max-Age=0"),
                    &self.inner.base_url,
                );
            }
        }
    }

    /// Build a URL for a path relative to the backend root.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::Parse("base URL cannot be a base".to_owned()))?;
            path.pop_if_empty();
            path.extend(segments);
        }
        Ok(url)
    }

    /// Start a request to a backend endpoint.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%method, %url, "backend request");
        Ok(self.inner.client.request(method, url))
    }

    /// Send a request and decode a JSON success body.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(request.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| ApiError::Parse(format!("{e}: {text}")))
    }

    /// Send a request and discard the success body.
    async fn send_unit(&self, request: RequestBuilder) -> Result<(), ApiError> {
        check_status(request.send().await?).await?;
        Ok(())
    }
}

/// Map a non-success response to an [`ApiError`].
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body
        .message
        .or(body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_owned());

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ApiError::Unauthorized(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY | StatusCode::CONFLICT => {
            ApiError::Validation {
                message,
                fields: body.errors,
            }
        }
        StatusCode::NOT_FOUND => ApiError::NotFound(message),
        StatusCode::TOO_MANY_REQUESTS => ApiError::RateLimited(retry_after.unwrap_or(1)),
        _ => ApiError::Status {
            status: status.as_u16(),
            message,
        },
    })
}
