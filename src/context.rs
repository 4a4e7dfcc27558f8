//! Per-call cancellation and deadline handling.

use std::future::{Future, pending};
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;

use crate::error::{CancelReason, ChatError, TransportError};
use crate::types::Provider;

/// Cancellation token plus optional deadline threaded through a single call.
///
/// Adapters check the context before touching the transport and race every transport
/// await against it, so a fired token or an elapsed deadline always surfaces as
/// [`ChatError::Canceled`] and never as a partial response.
///
/// # Examples
///
/// ```
/// # use std::time::Duration;
/// # use unichat::CallContext;
/// let ctx = CallContext::new().with_timeout(Duration::from_secs(30));
/// let token = ctx.cancellation().clone();
/// token.cancel();
/// assert!(ctx.is_canceled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancellation: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses an existing token, typically a child of a request-scoped token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails fast when the call is already canceled or past its deadline.
    pub fn ensure_active(&self, provider: Provider) -> Result<(), ChatError> {
        if self.cancellation.is_cancelled() {
            return Err(canceled(provider, CancelReason::Caller));
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Err(canceled(provider, CancelReason::DeadlineExceeded));
        }
        Ok(())
    }

    /// Drives a transport future until it completes, the token fires, or the deadline
    /// elapses, whichever happens first.
    ///
    /// Cancellation wins ties so a fired token is never reported as a transport result.
    pub async fn run<T, F>(&self, provider: Provider, operation: F) -> Result<T, ChatError>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let deadline = self.deadline;
        let expiry = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending::<()>().await,
            }
        };

        tokio::select! {
            biased;

            _ = self.cancellation.cancelled() => Err(canceled(provider, CancelReason::Caller)),
            _ = expiry => Err(canceled(provider, CancelReason::DeadlineExceeded)),
            result = operation => result.map_err(|source| ChatError::transport(provider, source)),
        }
    }
}

fn canceled(provider: Provider, reason: CancelReason) -> ChatError {
    ChatError::Canceled { provider, reason }
}
