use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::context::CallContext;
use crate::error::ChatError;
use crate::http::{DynHttpTransport, HttpRequest};
use crate::provider::retry::retry_after_from_headers;
use crate::provider::{ProviderAdapter, collect_body, encode_body, normalize_base_url};
use crate::types::{ChatRequest, ChatResponse, Provider};

use super::error::parse_ollama_error;
use super::request::build_ollama_request;
use super::response::map_response;
use super::stream::accumulate;
use super::types::{OllamaChatRequest, OllamaChatResponse};

const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// Ollama `/api/chat` Adapter
#[derive(Clone)]
pub struct OllamaAdapter {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl OllamaAdapter {
    /// 创建指向本地默认地址的 Adapter
    pub fn new(transport: DynHttpTransport) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            timeout: None,
        }
    }

    /// 覆盖服务地址
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 为反向代理或云端部署设置 Bearer Token
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// 单次 HTTP 请求超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/api/chat", normalize_base_url(&self.base_url))
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/x-ndjson".to_string());
        if let Some(key) = &self.api_key {
            headers.insert("Authorization".to_string(), format!("Bearer {key}"));
        }
        headers
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    const PROVIDER: Provider = Provider::Ollama;

    type NativeRequest = OllamaChatRequest;
    type NativeResponse = OllamaChatResponse;

    fn to_provider_request(&self, request: &ChatRequest) -> Result<OllamaChatRequest, ChatError> {
        build_ollama_request(request)
    }

    async fn send(
        &self,
        request: OllamaChatRequest,
        ctx: &CallContext,
    ) -> Result<OllamaChatResponse, ChatError> {
        let payload = encode_body(Self::PROVIDER, &request)?;
        let mut http =
            HttpRequest::post_json(self.endpoint(), payload).with_headers(self.build_headers());
        if let Some(timeout) = self.timeout {
            http = http.with_timeout(timeout);
        }

        let response = ctx
            .run(Self::PROVIDER, self.transport.send_stream(http))
            .await?;
        if !response.is_success() {
            let retry_after = retry_after_from_headers(&response.headers);
            let text = ctx.run(Self::PROVIDER, collect_body(response.body)).await?;
            return Err(ChatError::transport(
                Self::PROVIDER,
                parse_ollama_error(response.status, &text, retry_after),
            ));
        }

        accumulate(response.body, ctx).await
    }

    fn from_provider_response(
        &self,
        response: OllamaChatResponse,
        provider: Provider,
    ) -> Result<ChatResponse, ChatError> {
        Ok(map_response(response, provider))
    }
}
