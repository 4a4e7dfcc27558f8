//! 多后端 LLM 统一聊天调用库
//!
//! 调用方构造统一的 [`ChatRequest`] 由 [`ChatClient`] 校验后分发给对应供应商的 Adapter
//! 并返回统一的 [`ChatResponse`]

pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod http;
pub mod provider;
pub mod registry;
pub mod stream;
pub mod types;

pub use client::{ChatClient, ChatClientBuilder};
pub use config::{AnthropicConfig, ClientConfig, OllamaConfig, OpenAiConfig, build_client};
pub use context::CallContext;
pub use error::{CancelReason, ChatError, ErrorKind, TransportError};
pub use provider::{Adapter, AnthropicAdapter, OllamaAdapter, OpenAiAdapter, ProviderAdapter};
pub use registry::{ProviderRegistry, RegistryBuilder};
pub use types::*;
