//! Anthropic Messages adapter.
//!
//! Supported fields: `model`, `messages` (images as base64 blocks, assistant
//! `tool_calls` as `tool_use` blocks, `tool` messages as `tool_result` blocks), `system`
//! together with system-role messages (folded into the top-level `system`), `prompt`,
//! `max_tokens` (required by the API, defaulted when absent), `temperature`, `top_p`,
//! `top_k`, `stop_sequences`, `tools`, `tool_choice`, and `user` / `metadata["user_id"]`
//! (as `metadata.user_id`). Option-bag entries are merged at the top level of the body.

mod error;
mod provider;
mod request;
mod response;
mod types;

pub use provider::AnthropicAdapter;
pub use types::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicMessagesRequest,
    AnthropicMessagesResponse, AnthropicResponseBlock, AnthropicTool, AnthropicUsage,
};
