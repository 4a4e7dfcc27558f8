use futures_util::StreamExt;

use crate::context::CallContext;
use crate::error::{ChatError, TransportError};
use crate::http::HttpBodyStream;
use crate::provider::decode_body;
use crate::stream::LineDecoder;
use crate::types::Provider;

use super::types::{OllamaChatResponse, OllamaMessage, OllamaToolCall};

const PROVIDER: Provider = Provider::Ollama;

/// Folds streamed chunks into one response.
///
/// Message content and tool calls are concatenated; every other field takes the value
/// of the latest chunk that reports it. The result is only available once a chunk with
/// `done: true` has been seen.
#[derive(Debug, Default)]
pub(crate) struct ChunkAccumulator {
    summary: OllamaChatResponse,
    role: Option<String>,
    content: String,
    tool_calls: Vec<OllamaToolCall>,
    chunks: usize,
}

impl ChunkAccumulator {
    /// Applies one chunk and reports whether it was the terminal one.
    pub(crate) fn push(&mut self, chunk: OllamaChatResponse) -> Result<bool, TransportError> {
        if let Some(message) = chunk.error {
            return Err(TransportError::Upstream { message });
        }
        self.chunks += 1;

        if let Some(message) = chunk.message {
            if !message.role.is_empty() {
                self.role = Some(message.role);
            }
            self.content.push_str(&message.content);
            self.tool_calls.extend(message.tool_calls);
        }

        let summary = &mut self.summary;
        if !chunk.model.is_empty() {
            summary.model = chunk.model;
        }
        overwrite(&mut summary.created_at, chunk.created_at);
        overwrite(&mut summary.done_reason, chunk.done_reason);
        overwrite(&mut summary.total_duration, chunk.total_duration);
        overwrite(&mut summary.load_duration, chunk.load_duration);
        overwrite(&mut summary.prompt_eval_count, chunk.prompt_eval_count);
        overwrite(&mut summary.prompt_eval_duration, chunk.prompt_eval_duration);
        overwrite(&mut summary.eval_count, chunk.eval_count);
        overwrite(&mut summary.eval_duration, chunk.eval_duration);
        summary.done = chunk.done;

        Ok(summary.done)
    }

    pub(crate) fn finish(self) -> Result<OllamaChatResponse, TransportError> {
        if !self.summary.done {
            return Err(TransportError::StreamClosed {
                message: format!(
                    "stream ended after {} chunk(s) without a done marker",
                    self.chunks
                ),
            });
        }
        let mut response = self.summary;
        response.message = Some(OllamaMessage {
            role: self.role.unwrap_or_else(|| "assistant".to_string()),
            content: self.content,
            tool_calls: self.tool_calls,
            ..OllamaMessage::default()
        });
        Ok(response)
    }
}

fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Reads newline-delimited chunks until the terminal one, racing each read against `ctx`.
pub(crate) async fn accumulate(
    body: HttpBodyStream,
    ctx: &CallContext,
) -> Result<OllamaChatResponse, ChatError> {
    let mut lines = LineDecoder::new(body);
    let mut accumulator = ChunkAccumulator::default();

    while let Some(line) = ctx
        .run(PROVIDER, async { lines.next().await.transpose() })
        .await?
    {
        let chunk: OllamaChatResponse =
            decode_body(&line).map_err(|err| ChatError::transport(PROVIDER, err))?;
        let done = accumulator
            .push(chunk)
            .map_err(|err| ChatError::transport(PROVIDER, err))?;
        if done {
            break;
        }
    }

    let response = accumulator
        .finish()
        .map_err(|err| ChatError::transport(PROVIDER, err))?;
    tracing::debug!(
        provider = %PROVIDER,
        model = %response.model,
        prompt_eval_count = ?response.prompt_eval_count,
        eval_count = ?response.eval_count,
        total_duration_ns = ?response.total_duration,
        "stream accumulated"
    );
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use futures_util::stream;

    use super::*;
    use crate::error::CancelReason;

    fn body_from(lines: &[&str]) -> HttpBodyStream {
        let chunks: Vec<Result<Vec<u8>, TransportError>> = lines
            .iter()
            .map(|line| Ok(format!("{line}\n").into_bytes()))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    #[tokio::test]
    async fn concatenates_fragments_until_done() {
        let body = body_from(&[
            r#"{"model":"llama3","created_at":"t1","message":{"role":"assistant","content":"Hel"},"done":false}"#,
            r#"{"model":"llama3","created_at":"t2","message":{"role":"assistant","content":"lo, "},"done":false}"#,
            r#"{"model":"llama3","created_at":"t3","message":{"role":"assistant","content":"world"},"done":false}"#,
            r#"{"model":"llama3","created_at":"t4","message":{"role":"assistant","content":""},"done":true,"done_reason":"stop","prompt_eval_count":26,"eval_count":3,"total_duration":1200}"#,
        ]);

        let response = accumulate(body, &CallContext::new())
            .await
            .expect("accumulated");
        let message = response.message.expect("message");
        assert_eq!(message.content, "Hello, world");
        assert_eq!(message.role, "assistant");
        assert_eq!(response.created_at.as_deref(), Some("t4"));
        assert_eq!(response.done_reason.as_deref(), Some("stop"));
        assert_eq!(response.prompt_eval_count, Some(26));
        assert_eq!(response.eval_count, Some(3));
        assert!(response.done);
    }

    #[tokio::test]
    async fn ignores_lines_after_done() {
        let body = body_from(&[
            r#"{"model":"llama3","message":{"role":"assistant","content":"ok"},"done":true}"#,
            "not even json",
        ]);
        let response = accumulate(body, &CallContext::new())
            .await
            .expect("accumulated");
        assert_eq!(response.message.expect("message").content, "ok");
    }

    #[tokio::test]
    async fn missing_done_marker_is_stream_closed() {
        let body = body_from(&[
            r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#,
        ]);
        let err = accumulate(body, &CallContext::new())
            .await
            .expect_err("should fail");
        match err {
            ChatError::Transport {
                provider,
                source: TransportError::StreamClosed { message },
            } => {
                assert_eq!(provider, Provider::Ollama);
                assert!(message.contains("1 chunk"), "unexpected message: {message}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn in_stream_error_is_upstream_failure() {
        let body = body_from(&[
            r#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}"#,
            r#"{"error":"model runner has unexpectedly stopped"}"#,
        ]);
        let err = accumulate(body, &CallContext::new())
            .await
            .expect_err("should fail");
        match err {
            ChatError::Transport {
                source: TransportError::Upstream { message },
                ..
            } => assert!(message.contains("unexpectedly stopped")),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_chunk_is_decode_failure() {
        let body = body_from(&["{\"model\":"]);
        let err = accumulate(body, &CallContext::new())
            .await
            .expect_err("should fail");
        assert!(matches!(
            err,
            ChatError::Transport {
                source: TransportError::Decode { .. },
                ..
            }
        ));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_stalled_stream() {
        let first: Result<Vec<u8>, TransportError> = Ok(
            br#"{"model":"llama3","message":{"role":"assistant","content":"Hel"},"done":false}
"#
            .to_vec(),
        );
        let stalled = stream::once(async move { first }).chain(stream::once(async {
            pending::<Result<Vec<u8>, TransportError>>().await
        }));
        let body: HttpBodyStream = Box::pin(stalled);

        let ctx = CallContext::new();
        let token = ctx.cancellation().clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = accumulate(body, &ctx).await.expect_err("should cancel");
        match err {
            ChatError::Canceled { provider, reason } => {
                assert_eq!(provider, Provider::Ollama);
                assert_eq!(reason, CancelReason::Caller);
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }
}
