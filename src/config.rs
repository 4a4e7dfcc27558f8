use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::ChatClient;
use crate::error::ChatError;
use crate::http::DynHttpTransport;
use crate::provider::{AnthropicAdapter, OllamaAdapter, OpenAiAdapter};
use crate::types::Provider;

/// 客户端配置 仅注册出现的供应商
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ollama: Option<OllamaConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<OpenAiConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<AnthropicConfig>,
}

/// Ollama 配置 本地部署通常无需鉴权
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// 默认 `http://localhost:11434`
    pub base_url: Option<String>,
    /// 反向代理场景下的 Bearer Token
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// OpenAI 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    /// 默认 `https://api.openai.com`
    pub base_url: Option<String>,
    pub organization: Option<String>,
    pub project: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Anthropic 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    /// 默认 `https://api.anthropic.com`
    pub base_url: Option<String>,
    /// 默认 `2023-06-01`
    pub version: Option<String>,
    pub beta: Option<String>,
    /// 请求未设置 max_tokens 时使用 默认 1024
    pub default_max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// 根据配置构建 ChatClient
pub fn build_client(
    config: &ClientConfig,
    transport: DynHttpTransport,
) -> Result<ChatClient, ChatError> {
    let mut builder = ChatClient::builder();

    if let Some(config) = &config.ollama {
        let mut adapter = OllamaAdapter::new(transport.clone());
        if let Some(base_url) = &config.base_url {
            adapter = adapter.with_base_url(check_base_url(Provider::Ollama, base_url)?);
        }
        if let Some(api_key) = &config.api_key {
            adapter = adapter.with_api_key(check_api_key(Provider::Ollama, api_key)?);
        }
        if let Some(timeout) = timeout(Provider::Ollama, config.timeout_secs)? {
            adapter = adapter.with_timeout(timeout);
        }
        builder = builder.register(Provider::Ollama, adapter);
    }

    if let Some(config) = &config.openai {
        let api_key = check_api_key(Provider::OpenAi, &config.api_key)?;
        let mut adapter = OpenAiAdapter::new(transport.clone(), api_key);
        if let Some(base_url) = &config.base_url {
            adapter = adapter.with_base_url(check_base_url(Provider::OpenAi, base_url)?);
        }
        if let Some(org) = &config.organization {
            adapter = adapter.with_organization(org.clone());
        }
        if let Some(project) = &config.project {
            adapter = adapter.with_project(project.clone());
        }
        if let Some(timeout) = timeout(Provider::OpenAi, config.timeout_secs)? {
            adapter = adapter.with_timeout(timeout);
        }
        builder = builder.register(Provider::OpenAi, adapter);
    }

    if let Some(config) = &config.anthropic {
        let api_key = check_api_key(Provider::Anthropic, &config.api_key)?;
        let mut adapter = AnthropicAdapter::new(transport, api_key);
        if let Some(base_url) = &config.base_url {
            adapter = adapter.with_base_url(check_base_url(Provider::Anthropic, base_url)?);
        }
        if let Some(version) = &config.version {
            adapter = adapter.with_version(version.clone());
        }
        if let Some(beta) = &config.beta {
            adapter = adapter.with_beta(beta.clone());
        }
        if let Some(max_tokens) = config.default_max_tokens {
            if max_tokens == 0 {
                return Err(invalid(
                    Provider::Anthropic,
                    "default_max_tokens",
                    "must be greater than zero",
                ));
            }
            adapter = adapter.with_default_max_tokens(max_tokens);
        }
        if let Some(timeout) = timeout(Provider::Anthropic, config.timeout_secs)? {
            adapter = adapter.with_timeout(timeout);
        }
        builder = builder.register(Provider::Anthropic, adapter);
    }

    Ok(builder.build())
}

fn check_api_key(provider: Provider, api_key: &str) -> Result<String, ChatError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(invalid(provider, "api_key", "must not be empty"));
    }
    Ok(api_key.to_string())
}

fn check_base_url(provider: Provider, base_url: &str) -> Result<String, ChatError> {
    let base_url = base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(invalid(
            provider,
            "base_url",
            format!("expected an http(s) URL, got `{base_url}`"),
        ));
    }
    Ok(base_url.to_string())
}

fn timeout(provider: Provider, secs: Option<u64>) -> Result<Option<Duration>, ChatError> {
    match secs {
        Some(0) => Err(invalid(provider, "timeout_secs", "must be greater than zero")),
        Some(secs) => Ok(Some(Duration::from_secs(secs))),
        None => Ok(None),
    }
}

fn invalid(provider: Provider, field: &str, reason: impl Into<String>) -> ChatError {
    ChatError::InvalidConfig {
        provider,
        field: field.to_string(),
        reason: reason.into(),
    }
}
