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

use super::error::parse_openai_error;
use super::request::build_openai_request;
use super::response::map_response;
use super::types::{OpenAiChatRequest, OpenAiChatResponse};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI Chat Completions Adapter
#[derive(Clone)]
pub struct OpenAiAdapter {
    pub(crate) transport: DynHttpTransport,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) organization: Option<String>,
    pub(crate) project: Option<String>,
    pub(crate) timeout: Option<Duration>,
}

impl OpenAiAdapter {
    /// 创建带默认 base_url 的 Adapter
    pub fn new(transport: DynHttpTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: api_key.into(),
            organization: None,
            project: None,
            timeout: None,
        }
    }

    /// 覆盖 base_url 兼容带或不带 `/v1` 的写法
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// 设置组织 ID
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }

    /// 设置项目 ID
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// 单次 HTTP 请求超时
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", normalize_base_url(&self.base_url))
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Bearer {}", self.api_key),
        );
        headers.insert("Accept".to_string(), "application/json".to_string());
        if let Some(org) = &self.organization {
            headers.insert("OpenAI-Organization".to_string(), org.clone());
        }
        if let Some(project) = &self.project {
            headers.insert("OpenAI-Project".to_string(), project.clone());
        }
        headers
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    const PROVIDER: Provider = Provider::OpenAi;

    type NativeRequest = OpenAiChatRequest;
    type NativeResponse = OpenAiChatResponse;

    fn to_provider_request(&self, request: &ChatRequest) -> Result<OpenAiChatRequest, ChatError> {
        build_openai_request(request)
    }

    async fn send(
        &self,
        request: OpenAiChatRequest,
        ctx: &CallContext,
    ) -> Result<OpenAiChatResponse, ChatError> {
        let payload = encode_body(Self::PROVIDER, &request)?;
        let mut http =
            HttpRequest::post_json(self.endpoint(), payload).with_headers(self.build_headers());
        if let Some(timeout) = self.timeout {
            http = http.with_timeout(timeout);
        }

        let response = ctx.run(Self::PROVIDER, self.transport.send(http)).await?;
        ensure_success(response, parse_openai_error)
            .and_then(|text| decode_body(&text))
            .map_err(|err| ChatError::transport(Self::PROVIDER, err))
    }

    fn from_provider_response(
        &self,
        response: OpenAiChatResponse,
        provider: Provider,
    ) -> Result<ChatResponse, ChatError> {
        map_response(response, provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::reqwest::default_dyn_transport;

    #[test]
    fn endpoint_handles_versioned_base_url() {
        let transport = default_dyn_transport().expect("transport");
        let adapter = OpenAiAdapter::new(transport.clone(), "sk-test");
        assert_eq!(
            adapter.endpoint(),
            "https://api.openai.com/v1/chat/completions"
        );

        let adapter =
            OpenAiAdapter::new(transport, "sk-test").with_base_url("https://proxy.local/v1/");
        assert_eq!(adapter.endpoint(), "https://proxy.local/v1/chat/completions");
    }

    #[test]
    fn headers_carry_credentials_and_org() {
        let transport = default_dyn_transport().expect("transport");
        let headers = OpenAiAdapter::new(transport, "sk-test")
            .with_organization("org-1")
            .build_headers();
        assert_eq!(
            headers.get("Authorization"),
            Some(&"Bearer sk-test".to_string())
        );
        assert_eq!(
            headers.get("OpenAI-Organization"),
            Some(&"org-1".to_string())
        );
        assert!(!headers.contains_key("OpenAI-Project"));
    }
}
