use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::error::TransportError;

pub(crate) fn parse_openai_error(
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
        code: Option<Value>,
    }

    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            error: Some(error),
        }) => {
            let message = error.message.unwrap_or_else(|| "unknown error".to_string());
            match error.code {
                Some(Value::String(code)) => format!("{message} ({code})"),
                Some(Value::Null) | None => message,
                Some(code) => format!("{message} ({code})"),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_error_code_in_message() {
        let body = r#"{"error":{"message":"Rate limit reached","type":"requests","code":"rate_limit_exceeded"}}"#;
        let err = parse_openai_error(429, body, Some(Duration::from_secs(20)));
        match err {
            TransportError::Status {
                status,
                message,
                retry_after,
            } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Rate limit reached (rate_limit_exceeded)");
                assert_eq!(retry_after, Some(Duration::from_secs(20)));
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn null_code_is_omitted() {
        let body = r#"{"error":{"message":"Invalid API key","type":"invalid_request_error","code":null}}"#;
        match parse_openai_error(401, body, None) {
            TransportError::Status { message, .. } => assert_eq!(message, "Invalid API key"),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn non_json_body_is_kept_verbatim() {
        match parse_openai_error(503, "upstream connect error", None) {
            TransportError::Status { message, .. } => {
                assert_eq!(message, "upstream connect error")
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }
}
