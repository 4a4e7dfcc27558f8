//! OpenAI Chat Completions adapter.
//!
//! Supported fields: `model`, `messages` (images as data URLs, `name`, `tool_call_id`,
//! `tool_calls`), `system`, `prompt`, `temperature`, `top_p`, `max_tokens`
//! (`max_completion_tokens`), `stop_sequences` (`stop`), `presence_penalty`,
//! `frequency_penalty`, `seed`, `logprobs`, `top_logprobs`, `response_format`, `tools`,
//! `tool_choice`, `logit_bias`, `user` and `metadata`. Option-bag entries are merged at
//! the top level of the body.
//!
//! Only the first returned choice is read.

mod error;
mod provider;
mod request;
mod response;
mod types;

pub use provider::OpenAiAdapter;
pub use types::{
    OpenAiChatRequest, OpenAiChatResponse, OpenAiChoice, OpenAiContent, OpenAiContentPart,
    OpenAiFunction, OpenAiFunctionCall, OpenAiImageUrl, OpenAiLogProbs, OpenAiMessage,
    OpenAiResponseMessage, OpenAiTokenLogProb, OpenAiTool, OpenAiToolCall, OpenAiTopLogProb,
    OpenAiUsage,
};
