use std::time::Duration;

use serde::Deserialize;

use crate::error::TransportError;

/// Parses the `{"error": "..."}` body Ollama returns for non-2xx statuses.
pub(crate) fn parse_ollama_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> TransportError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.error)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| body.trim().to_string());

    TransportError::Status {
        status,
        message,
        retry_after,
    }
}
