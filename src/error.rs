use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::types::Provider;

/// Every failure mode surfaced by [`crate::ChatClient`].
///
/// Each variant carries the provider the failure originated from so callers can decide
/// whether to fall back to another backend or surface an actionable message. No layer
/// of the crate retries or recovers; errors reach the caller as produced.
#[derive(Debug, Error)]
pub enum ChatError {
    /// The unified request was malformed. Always the caller's fault.
    #[error("[{provider}] invalid request: {message}")]
    InvalidRequest { provider: Provider, message: String },
    /// The provider identifier is not known to this crate.
    #[error("[{provider}] unknown provider")]
    UnknownProvider {
        /// Identifier exactly as supplied by the caller.
        provider: String,
    },
    /// The provider has a bundled adapter but was not registered at startup.
    #[error("[{provider}] provider not configured")]
    ProviderNotConfigured { provider: Provider },
    /// An adapter could not map a field onto its native shape.
    #[error("[{provider}] translation failed: {message}")]
    Translation { provider: Provider, message: String },
    /// The backend call itself failed.
    #[error("[{provider}] transport failed: {source}")]
    Transport {
        provider: Provider,
        #[source]
        source: TransportError,
    },
    /// The call was canceled by the caller or ran past its deadline.
    #[error("[{provider}] request canceled: {reason}")]
    Canceled {
        provider: Provider,
        reason: CancelReason,
    },
    /// Configuration was rejected while building the client.
    #[error("[{provider}] invalid configuration for {field}: {reason}")]
    InvalidConfig {
        provider: Provider,
        /// Name of the configuration field that failed validation.
        field: String,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
}

/// Flat classification of [`ChatError`] variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidRequest,
    UnknownProvider,
    ProviderNotConfigured,
    Translation,
    Transport,
    Canceled,
    InvalidConfig,
}

/// Why a call stopped before completing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller fired the cancellation token.
    Caller,
    /// The deadline attached to the call elapsed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Caller => f.write_str("canceled by caller"),
            CancelReason::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

impl ChatError {
    /// Creates a [`ChatError::InvalidRequest`] for the given provider.
    ///
    /// # Examples
    ///
    /// ```
    /// use unichat::{ChatError, ErrorKind, Provider};
    ///
    /// let err = ChatError::invalid_request(Provider::Ollama, "model is required");
    /// assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    /// ```
    pub fn invalid_request<T: Into<String>>(provider: Provider, message: T) -> Self {
        Self::InvalidRequest {
            provider,
            message: message.into(),
        }
    }

    /// Creates a [`ChatError::Translation`] for the given provider.
    pub fn translation<T: Into<String>>(provider: Provider, message: T) -> Self {
        Self::Translation {
            provider,
            message: message.into(),
        }
    }

    /// Wraps a [`TransportError`] with the provider it came from.
    pub fn transport(provider: Provider, source: TransportError) -> Self {
        Self::Transport { provider, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            ChatError::UnknownProvider { .. } => ErrorKind::UnknownProvider,
            ChatError::ProviderNotConfigured { .. } => ErrorKind::ProviderNotConfigured,
            ChatError::Translation { .. } => ErrorKind::Translation,
            ChatError::Transport { .. } => ErrorKind::Transport,
            ChatError::Canceled { .. } => ErrorKind::Canceled,
            ChatError::InvalidConfig { .. } => ErrorKind::InvalidConfig,
        }
    }

    /// Identifier of the provider the error is tagged with.
    pub fn provider(&self) -> &str {
        match self {
            ChatError::UnknownProvider { provider } => provider,
            ChatError::InvalidRequest { provider, .. }
            | ChatError::ProviderNotConfigured { provider }
            | ChatError::Translation { provider, .. }
            | ChatError::Transport { provider, .. }
            | ChatError::Canceled { provider, .. }
            | ChatError::InvalidConfig { provider, .. } => provider.as_str(),
        }
    }

    /// Advisory hint on whether re-sending the same request could succeed.
    ///
    /// Only transport failures qualify: network errors, 408/429/5xx statuses and streams
    /// that closed before their terminal chunk. The crate never acts on this itself.
    pub fn is_retryable(&self) -> bool {
        match self {
            ChatError::Transport { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// `Retry-After` hint carried by a throttled or unavailable backend, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            ChatError::Transport {
                source: TransportError::Status { retry_after, .. },
                ..
            } => *retry_after,
            _ => None,
        }
    }
}

/// Failures raised while talking to a backend.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, DNS or I/O failure before a status was received.
    #[error("network error: {message}")]
    Network { message: String },
    /// The backend answered with a non-2xx status.
    #[error("status {status}: {message}")]
    Status {
        status: u16,
        /// Message extracted from the vendor error body, or the raw body.
        message: String,
        /// Optional wait duration suggested by the backend.
        retry_after: Option<Duration>,
    },
    /// The response body could not be decoded into the native response type.
    #[error("failed to decode response: {message}")]
    Decode { message: String },
    /// The backend reported an error inside an otherwise successful response.
    #[error("upstream error: {message}")]
    Upstream { message: String },
    /// A streamed response ended before its terminal chunk.
    #[error("stream closed unexpectedly: {message}")]
    StreamClosed { message: String },
}

impl TransportError {
    /// Creates a [`TransportError::Network`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use unichat::TransportError;
    ///
    /// let err = TransportError::network("dns lookup failed");
    /// assert!(matches!(err, TransportError::Network { .. }));
    /// ```
    pub fn network<T: Into<String>>(message: T) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn decode<T: Into<String>>(message: T) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Network { .. } | TransportError::StreamClosed { .. } => true,
            TransportError::Status { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            TransportError::Decode { .. } | TransportError::Upstream { .. } => false,
        }
    }
}
