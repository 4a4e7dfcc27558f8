use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::ChatError;
use crate::http::{DynHttpTransport, HttpRequest};
use crate::provider::{
    ProviderAdapter, decode_body, encode_body, ensure_success, normalize_base_url,
};
use crate::types::{ChatRequest, ChatResponse, Provider};

use super::error::parse_anthropic_error;
use super::request::build_anthropic_request;
use super::response::map_response;
use super::types::{AnthropicMessagesRequest, AnthropicMessagesResponse};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_VERSION: &str = "2023-06-01";
/// `max_tokens` is mandatory for Anthropic; used when the request leaves it unset.
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Anthropic Messages Adapter
#[derive(Clone)]
pub struct AnthropicAdapter {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) version: String,
    pub(crate) beta: Option<String>,
    pub(crate) default_max_tokens: u32,
    pub(crate) timeout: Option<Duration>,
}

impl AnthropicAdapter {
    /// 创建 Adapter
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            version: DEFAULT_VERSION.to_string(),
            beta: None,
            default_max_tokens: DEFAULT_MAX_TOKENS,
            timeout: None,
        }
    }

    /// 覆盖 base_url
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置 anthropic-version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 设置 anthropic-beta
    pub fn with_beta(mut self, beta: impl Into<String>) -> Self {
        self.beta = Some(beta.into());
        self
    }

    /// 请求未指定 max_tokens 时的回退值
    pub fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// 单次 HTTP 请求超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/v1/messages", normalize_base_url(&self.base_url))
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("x-api-key".to_string(), self.api_key.clone());
        headers.insert("anthropic-version".to_string(), self.version.clone());
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(beta) = &self.beta {
            headers.insert("anthropic-beta".to_string(), beta.clone());
        }
        headers
    }
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    const PROVIDER: Provider = Provider::Anthropic;

    type NativeRequest = AnthropicMessagesRequest;
    type NativeResponse = AnthropicMessagesResponse;

    fn to_provider_request(
        &self,
        request: &ChatRequest,
    ) -> Result<AnthropicMessagesRequest, ChatError> {
        build_anthropic_request(request, self.default_max_tokens)
    }

    async fn send(
        &self,
        request: AnthropicMessagesRequest,
        ctx: &CallContext,
    ) -> Result<AnthropicMessagesResponse, ChatError> {
        let payload = encode_body(Self::PROVIDER, &request)?;
        let mut http =
            HttpRequest::post_json(self.endpoint(), payload).with_headers(self.build_headers());
        if let Some(timeout) = self.timeout {
            http = http.with_timeout(timeout);
        }

        let response = ctx.run(Self::PROVIDER, self.transport.send(http)).await?;
        ensure_success(response, parse_anthropic_error)
            .and_then(|text| decode_body(&text))
            .map_err(|err| ChatError::transport(Self::PROVIDER, err))
    }

    fn from_provider_response(
        &self,
        response: AnthropicMessagesResponse,
        provider: Provider,
    ) -> Result<ChatResponse, ChatError> {
        Ok(map_response(response, provider))
    }
}
