use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::context::CallContext;
use crate::error::{ChatError, TransportError};
use crate::http::{HttpBodyStream, HttpResponse};
use crate::types::{ChatRequest, ChatResponse, Message, Provider, ProviderOptions};

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub(crate) mod retry;

pub use anthropic::AnthropicAdapter;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;

use retry::retry_after_from_headers;

/// 统一的 Adapter Trait 负责统一请求与供应商原生请求之间的双向转换
///
/// 转换函数是纯函数 只有 `send` 会触达网络
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// 该 Adapter 对应的供应商 用于标记错误来源
    const PROVIDER: Provider;

    /// 供应商原生请求
    type NativeRequest: Send;
    /// 供应商原生响应
    type NativeResponse: Send;

    /// 将统一请求映射为原生请求 不支持的字段直接忽略
    fn to_provider_request(&self, request: &ChatRequest)
    -> Result<Self::NativeRequest, ChatError>;

    /// 通过 transport 发送原生请求
    async fn send(
        &self,
        request: Self::NativeRequest,
        ctx: &CallContext,
    ) -> Result<Self::NativeResponse, ChatError>;

    /// 将原生响应映射为统一响应 `provider` 为注册时使用的标识
    fn from_provider_response(
        &self,
        response: Self::NativeResponse,
        provider: Provider,
    ) -> Result<ChatResponse, ChatError>;
}

/// 内置 Adapter 的封闭集合
#[derive(Clone)]
pub enum Adapter {
    Ollama(OllamaAdapter),
    OpenAi(OpenAiAdapter),
    Anthropic(AnthropicAdapter),
}

impl Adapter {
    /// Adapter 自身对应的供应商
    pub fn provider(&self) -> Provider {
        match self {
            Adapter::Ollama(_) => OllamaAdapter::PROVIDER,
            Adapter::OpenAi(_) => OpenAiAdapter::PROVIDER,
            Adapter::Anthropic(_) => AnthropicAdapter::PROVIDER,
        }
    }

    /// 依次执行请求转换 发送 响应转换
    pub async fn chat(
        &self,
        provider: Provider,
        request: &ChatRequest,
        ctx: &CallContext,
    ) -> Result<ChatResponse, ChatError> {
        match self {
            Adapter::Ollama(adapter) => execute(adapter, provider, request, ctx).await,
            Adapter::OpenAi(adapter) => execute(adapter, provider, request, ctx).await,
            Adapter::Anthropic(adapter) => execute(adapter, provider, request, ctx).await,
        }
    }
}

impl From<OllamaAdapter> for Adapter {
    fn from(adapter: OllamaAdapter) -> Self {
        Adapter::Ollama(adapter)
    }
}

impl From<OpenAiAdapter> for Adapter {
    fn from(adapter: OpenAiAdapter) -> Self {
        Adapter::OpenAi(adapter)
    }
}

impl From<AnthropicAdapter> for Adapter {
    fn from(adapter: AnthropicAdapter) -> Self {
        Adapter::Anthropic(adapter)
    }
}

async fn execute<A: ProviderAdapter>(
    adapter: &A,
    provider: Provider,
    request: &ChatRequest,
    ctx: &CallContext,
) -> Result<ChatResponse, ChatError> {
    ctx.ensure_active(A::PROVIDER)?;
    let native = adapter.to_provider_request(request)?;
    let response = adapter.send(native, ctx).await?;
    adapter.from_provider_response(response, provider)
}

/// Returns the option-bag entries whose keys are not already present in `occupied`.
///
/// `occupied` is the serialized native request (or its nested options object), so
/// explicit unified fields always win over the catch-all bag.
pub(crate) fn merge_options(
    occupied: &Map<String, Value>,
    options: &ProviderOptions,
) -> Map<String, Value> {
    options
        .iter()
        .filter(|(key, _)| !occupied.contains_key(key.as_str()))
        .map(|(key, value)| (key.clone(), value.to_json()))
        .collect()
}

/// Serializes a native request body.
pub(crate) fn encode_body<T: Serialize>(provider: Provider, body: &T) -> Result<Vec<u8>, ChatError> {
    serde_json::to_vec(body).map_err(|err| {
        ChatError::translation(provider, format!("failed to serialize request: {err}"))
    })
}

/// Serializes a native request into the object used to detect occupied keys.
pub(crate) fn encode_object<T: Serialize>(
    provider: Provider,
    value: &T,
) -> Result<Map<String, Value>, ChatError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(other) => Err(ChatError::translation(
            provider,
            format!("request serialized to a non-object value: {other}"),
        )),
        Err(err) => Err(ChatError::translation(
            provider,
            format!("failed to serialize request: {err}"),
        )),
    }
}

pub(crate) fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, TransportError> {
    serde_json::from_str(text).map_err(|err| TransportError::decode(err.to_string()))
}

/// Returns the body text of a 2xx response, or the vendor error built by `parse_error`.
pub(crate) fn ensure_success(
    response: HttpResponse,
    parse_error: fn(u16, &str, Option<Duration>) -> TransportError,
) -> Result<String, TransportError> {
    let status = response.status;
    let success = response.is_success();
    let retry_after = retry_after_from_headers(&response.headers);
    let text = response.into_string()?;
    if success {
        Ok(text)
    } else {
        Err(parse_error(status, &text, retry_after))
    }
}

/// Drains a streaming body into a string, used for non-2xx streamed responses.
pub(crate) async fn collect_body(mut body: HttpBodyStream) -> Result<String, TransportError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = body.next().await {
        buffer.extend_from_slice(&chunk?);
    }
    String::from_utf8(buffer)
        .map_err(|err| TransportError::decode(format!("response body is not UTF-8: {err}")))
}

/// Decodes opaque tool-call arguments into the JSON object some vendors require.
pub(crate) fn parse_arguments(provider: Provider, arguments: &str) -> Result<Value, ChatError> {
    if arguments.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    serde_json::from_str(arguments).map_err(|err| {
        ChatError::translation(provider, format!("tool call arguments are not valid JSON: {err}"))
    })
}

/// `prompt` becomes a trailing user turn after the conversation.
pub(crate) fn prompt_message(request: &ChatRequest) -> Option<Message> {
    request.prompt_text().map(Message::user)
}

/// Guesses the media type of a base64 image from its leading bytes.
pub(crate) fn image_media_type(base64: &str) -> &'static str {
    if base64.starts_with("/9j/") {
        "image/jpeg"
    } else if base64.starts_with("R0lGOD") {
        "image/gif"
    } else if base64.starts_with("UklGR") {
        "image/webp"
    } else {
        "image/png"
    }
}

/// Trims a trailing slash and a trailing `/v1` so both base URL styles work.
pub(crate) fn normalize_base_url(base_url: &str) -> &str {
    let trimmed = base_url.trim_end_matches('/');
    trimmed.strip_suffix("/v1").unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OptionValue;
    use serde_json::json;

    #[test]
    fn merge_options_is_first_write_wins() {
        let occupied = json!({ "temperature": 0.2, "model": "llama3" });
        let occupied = occupied.as_object().expect("object");
        let options = ProviderOptions::from([
            ("temperature".to_string(), OptionValue::Number(0.9)),
            ("mirostat".to_string(), OptionValue::Integer(2)),
        ]);
        let merged = merge_options(occupied, &options);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("mirostat"), Some(&json!(2)));
    }

    #[test]
    fn parse_arguments_rejects_invalid_json() {
        assert_eq!(
            parse_arguments(Provider::Ollama, "").expect("empty"),
            json!({})
        );
        assert_eq!(
            parse_arguments(Provider::Ollama, r#"{"city":"Paris"}"#).expect("object"),
            json!({ "city": "Paris" })
        );
        let err = parse_arguments(Provider::Anthropic, "{city").expect_err("invalid");
        match err {
            ChatError::Translation { provider, .. } => assert_eq!(provider, Provider::Anthropic),
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn image_media_type_sniffs_common_headers() {
        assert_eq!(image_media_type("/9j/4AAQSkZJRg"), "image/jpeg");
        assert_eq!(image_media_type("iVBORw0KGgo"), "image/png");
        assert_eq!(image_media_type("R0lGODlh"), "image/gif");
        assert_eq!(image_media_type("UklGRiQAAABXRUJQ"), "image/webp");
        assert_eq!(image_media_type("AAAA"), "image/png");
    }

    #[test]
    fn normalize_base_url_strips_version_suffix() {
        assert_eq!(normalize_base_url("https://api.openai.com/v1/"), "https://api.openai.com");
        assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434");
    }
}
