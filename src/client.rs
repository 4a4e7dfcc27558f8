use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::context::CallContext;
use crate::error::ChatError;
use crate::provider::Adapter;
use crate::registry::{ProviderRegistry, RegistryBuilder};
use crate::types::{ChatRequest, ChatResponse, Provider};

/// 统一调用入口 校验请求 解析 Adapter 并转发调用
///
/// 内部只持有只读注册表 克隆代价很低 可在多个任务间并发使用
#[derive(Clone)]
pub struct ChatClient {
    registry: Arc<ProviderRegistry>,
}

impl ChatClient {
    /// 创建 Builder 便于注册 Adapter
    pub fn builder() -> ChatClientBuilder {
        ChatClientBuilder {
            registry: ProviderRegistry::builder(),
        }
    }

    /// 直接使用已构建的注册表
    pub fn from_registry(registry: ProviderRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// 发送聊天请求 使用不可取消 无截止时间的上下文
    pub async fn chat(
        &self,
        provider: Provider,
        request: ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        self.chat_with_context(provider, request, &CallContext::new())
            .await
    }

    /// 发送聊天请求 由 `ctx` 控制取消与截止时间
    pub async fn chat_with_context(
        &self,
        provider: Provider,
        request: ChatRequest,
        ctx: &CallContext,
    ) -> Result<ChatResponse, ChatError> {
        if let Err(err) = request.validate(provider) {
            warn!(provider = %provider, error = %err, "rejected chat request");
            return Err(err);
        }
        let adapter = self.resolve(provider)?;

        debug!(
            provider = %provider,
            adapter = %adapter.provider(),
            model = %request.model,
            messages = request.messages.len(),
            "dispatching chat request"
        );

        adapter
            .chat(provider, &request, ctx)
            .await
            .inspect_err(|err| {
                if matches!(err, ChatError::Transport { .. }) {
                    error!(provider = %err.provider(), error = %err, "chat request failed");
                }
            })
    }

    /// 按文本标识发送请求 无法识别的标识返回 UnknownProvider
    pub async fn chat_named(
        &self,
        provider: &str,
        request: ChatRequest,
    ) -> Result<ChatResponse, ChatError> {
        let provider = provider.parse::<Provider>().inspect_err(|err| {
            warn!(error = %err, "unknown provider identifier");
        })?;
        self.chat(provider, request).await
    }

    /// 返回已注册的供应商
    pub fn providers(&self) -> Vec<Provider> {
        self.registry.providers()
    }

    /// 访问底层注册表
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    fn resolve(&self, provider: Provider) -> Result<&Adapter, ChatError> {
        self.registry.resolve(provider).ok_or_else(|| {
            warn!(provider = %provider, "no adapter registered for provider");
            if provider.has_adapter() {
                ChatError::ProviderNotConfigured { provider }
            } else {
                ChatError::UnknownProvider {
                    provider: provider.to_string(),
                }
            }
        })
    }
}

/// 负责注册 Adapter 的 Builder
pub struct ChatClientBuilder {
    registry: RegistryBuilder,
}

impl ChatClientBuilder {
    /// 注册供应商对应的 Adapter 重复注册时后者覆盖前者
    pub fn register(mut self, provider: Provider, adapter: impl Into<Adapter>) -> Self {
        self.registry = self.registry.register(provider, adapter);
        self
    }

    /// 构建最终的 ChatClient
    pub fn build(self) -> ChatClient {
        ChatClient::from_registry(self.registry.build())
    }
}
