//! Ollama `/api/chat` adapter.
//!
//! Supported fields: `model`, `messages` (with `images`, `tool_calls` and the tool name
//! as `tool_name`), `system`, `prompt`, `tools`, `response_format` (as `format`),
//! `keep_alive`, plus `temperature`, `top_p`, `top_k`, `max_tokens` (`num_predict`),
//! `presence_penalty`, `frequency_penalty`, `seed` and `stop_sequences` (`stop`) inside
//! `options`. Option-bag entries are merged into `options`.
//!
//! Responses are always requested as a newline-delimited JSON stream and accumulated
//! into a single choice.

mod error;
mod provider;
mod request;
mod response;
mod stream;
mod types;

pub use provider::OllamaAdapter;
pub use types::{
    OllamaChatRequest, OllamaChatResponse, OllamaFunction, OllamaFunctionCall, OllamaMessage,
    OllamaTool, OllamaToolCall,
};
