use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::TransportError;

/// Methods the adapters issue. Every chat endpoint is a `POST`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
}

/// Outgoing request assembled by an adapter and handed to an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Vec<u8>>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    /// `POST` with an already-serialized JSON payload and a matching `Content-Type`.
    ///
    /// # Examples
    ///
    /// ```
    /// use unichat::http::{HttpMethod, HttpRequest};
    ///
    /// let request = HttpRequest::post_json("http://localhost:11434/api/chat", br"{}".to_vec());
    /// assert_eq!(request.method, HttpMethod::Post);
    /// assert_eq!(request.headers.get("Content-Type"), Some(&"application/json".to_string()));
    /// ```
    pub fn post_json(url: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: Some(body),
            timeout: None,
        }
    }

    /// Adds or replaces a single header.
    ///
    /// # Examples
    ///
    /// ```
    /// use unichat::http::HttpRequest;
    ///
    /// let request = HttpRequest::post_json("https://example.com", br"{}".to_vec())
    ///     .with_header("x-api-key", "secret");
    /// assert_eq!(request.headers.get("x-api-key"), Some(&"secret".to_string()));
    /// ```
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Merges additional headers into the request, replacing existing names.
    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Fully buffered response, used by the non-streaming adapters.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as text, ready for vendor error parsing or JSON decoding.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Decode`] when the body is not valid UTF-8.
    pub fn into_string(self) -> Result<String, TransportError> {
        String::from_utf8(self.body)
            .map_err(|err| TransportError::decode(format!("response body is not UTF-8: {err}")))
    }

    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }
}

/// Response whose body is consumed incrementally, used for NDJSON chat streams.
pub struct HttpStreamResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: HttpBodyStream,
}

impl HttpStreamResponse {
    pub fn is_success(&self) -> bool {
        is_success(self.status)
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Raw byte chunks with arbitrary boundaries; see [`crate::stream::LineDecoder`].
pub type HttpBodyStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, TransportError>> + Send>>;

/// Transport abstraction that decouples adapters from the concrete HTTP client.
///
/// Implementations only move bytes. Status handling, vendor error parsing and body
/// decoding stay in the adapters.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Resolves once the whole body has been read.
    ///
    /// # Examples
    ///
    /// ```
    /// # use async_trait::async_trait;
    /// # use unichat::http::{HttpTransport, HttpRequest, HttpResponse, HttpStreamResponse};
    /// # use unichat::TransportError;
    /// /// Stand-in used while the machine is offline.
    /// struct Offline;
    ///
    /// #[async_trait]
    /// impl HttpTransport for Offline {
    ///     async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
    ///         Err(TransportError::network(format!("offline: {}", request.url)))
    ///     }
    ///     async fn send_stream(&self, request: HttpRequest) -> Result<HttpStreamResponse, TransportError> {
    ///         Err(TransportError::network(format!("offline: {}", request.url)))
    ///     }
    /// }
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let err = Offline
    ///     .send(HttpRequest::post_json("http://localhost:11434/api/chat", br"{}".to_vec()))
    ///     .await
    ///     .unwrap_err();
    /// assert!(err.is_retryable());
    /// # });
    /// ```
    ///
    /// # Errors
    ///
    /// Implementations should map connection failures to [`TransportError::Network`].
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;

    /// Resolves as soon as the status line and headers arrive.
    ///
    /// # Errors
    ///
    /// Implementations should map connection failures to [`TransportError::Network`].
    async fn send_stream(&self, request: HttpRequest)
    -> Result<HttpStreamResponse, TransportError>;
}

/// Shared transport handle; one instance usually serves every adapter.
pub type DynHttpTransport = Arc<dyn HttpTransport>;

pub mod reqwest;
