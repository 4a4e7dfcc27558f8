use std::time::Duration;

use serde::Deserialize;

use crate::error::TransportError;

/// Parses error responses returned by the Anthropic Messages API.
///
/// The body looks like `{"type":"error","error":{"type":"overloaded_error","message":"..."}}`;
/// the inner type is appended to the message so callers can tell throttling from
/// validation failures without a status table.
pub(crate) fn parse_anthropic_error(
    status: u16,
    body: &str,
    retry_after: Option<Duration>,
) -> TransportError {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<InnerError>,
    }

    #[derive(Deserialize)]
    struct InnerError {
        message: Option<String>,
        r#type: Option<String>,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
        }) => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.r#type {
                Some(kind) => format!("{message} ({kind})"),
                None => message,
            }
        }
        _ => body.trim().to_string(),
    };

    TransportError::Status {
        status,
        message,
        retry_after,
    }
}
