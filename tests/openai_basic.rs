mod support;

use std::time::Duration;

use serde_json::json;
use support::{MockTransport, Reply};
use unichat::{
    ChatClient, ChatError, ChatRequest, Message, OpenAiAdapter, Provider, ResponseFormat, Tool,
    ToolCall, ToolChoice, TransportError,
};

const ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";

fn client(transport: std::sync::Arc<MockTransport>) -> ChatClient {
    ChatClient::builder()
        .register(
            Provider::OpenAi,
            OpenAiAdapter::new(transport, "sk-test").with_project("proj-1"),
        )
        .build()
}

#[tokio::test]
async fn openai_chat_round_trip_with_tools() {
    let transport = MockTransport::new()
        .route(
            ENDPOINT,
            Reply::json(
                200,
                json!({
                    "id": "chatcmpl-42",
                    "object": "chat.completion",
                    "model": "gpt-4o-mini-2024-07-18",
                    "choices": [{
                        "index": 0,
                        "message": {
                            "role": "assistant",
                            "content": null,
                            "tool_calls": [{
                                "id": "call_abc",
                                "type": "function",
                                "function": { "name": "get_weather", "arguments": "{\"city\":\"Paris\"}" }
                            }]
                        },
                        "finish_reason": "tool_calls"
                    }],
                    "usage": { "prompt_tokens": 40, "completion_tokens": 9, "total_tokens": 49 }
                }),
            ),
        )
        .into_shared();

    let request = ChatRequest {
        system: Some("You are a weather bot.".to_string()),
        tools: vec![Tool {
            name: "get_weather".to_string(),
            description: Some("Current weather for a city".to_string()),
            parameters: Some(json!({
                "type": "object",
                "properties": { "city": { "type": "string" } },
                "required": ["city"]
            })),
        }],
        tool_choice: Some(ToolChoice::Auto),
        user: Some("user-1".to_string()),
        ..ChatRequest::new("gpt-4o-mini", vec![Message::user("Weather in Paris?")])
    }
    .with_option("service_tier", "default");

    let response = client(transport.clone())
        .chat(Provider::OpenAi, request)
        .await
        .expect("chat should succeed");

    assert_eq!(response.id.as_deref(), Some("chatcmpl-42"));
    assert_eq!(response.provider, Provider::OpenAi);
    let choice = &response.choices[0];
    assert_eq!(choice.finish_reason.as_str(), "tool_calls");
    assert_eq!(choice.message.content, "");
    assert_eq!(
        choice.message.tool_calls,
        vec![ToolCall::function("call_abc", "get_weather", r#"{"city":"Paris"}"#)]
    );
    assert_eq!(response.usage.and_then(|usage| usage.total_tokens), Some(49));

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].headers.get("Authorization"),
        Some(&"Bearer sk-test".to_string())
    );
    assert_eq!(
        requests[0].headers.get("OpenAI-Project"),
        Some(&"proj-1".to_string())
    );

    let body = transport.request_json(0);
    assert_eq!(body["stream"], json!(false));
    assert_eq!(body["user"], json!("user-1"));
    assert_eq!(body["tool_choice"], json!("auto"));
    assert_eq!(body["service_tier"], json!("default"));
    assert_eq!(
        body["messages"],
        json!([
            { "role": "system", "content": "You are a weather bot." },
            { "role": "user", "content": "Weather in Paris?" }
        ])
    );
}

#[tokio::test]
async fn openai_json_schema_response_format_is_forwarded() {
    let transport = MockTransport::new()
        .route(
            ENDPOINT,
            Reply::json(
                200,
                json!({
                    "model": "gpt-4o",
                    "choices": [{ "message": { "content": "{\"ok\":true}" }, "finish_reason": "stop" }]
                }),
            ),
        )
        .into_shared();

    let request = ChatRequest {
        response_format: Some(ResponseFormat::JsonSchema {
            name: "status".to_string(),
            schema: json!({ "type": "object", "properties": { "ok": { "type": "boolean" } } }),
            strict: Some(true),
        }),
        ..ChatRequest::from_prompt("gpt-4o", "status?")
    };
    let response = client(transport.clone())
        .chat(Provider::OpenAi, request)
        .await
        .expect("chat should succeed");
    assert_eq!(response.content(), Some("{\"ok\":true}"));

    let body = transport.request_json(0);
    assert_eq!(body["response_format"]["type"], json!("json_schema"));
    assert_eq!(body["response_format"]["json_schema"]["name"], json!("status"));
    assert_eq!(body["response_format"]["json_schema"]["strict"], json!(true));
}

#[tokio::test]
async fn openai_rate_limit_keeps_retry_after() {
    let transport = MockTransport::new()
        .route(
            ENDPOINT,
            Reply::json(
                429,
                json!({ "error": { "message": "Rate limit reached", "type": "requests", "code": "rate_limit_exceeded" } }),
            )
            .with_header("retry-after", "7"),
        )
        .into_shared();

    let err = client(transport)
        .chat(Provider::OpenAi, ChatRequest::from_prompt("gpt-4o-mini", "hi"))
        .await
        .expect_err("should be throttled");
    assert!(err.is_retryable());
    assert_eq!(err.retry_after(), Some(Duration::from_secs(7)));
    match err {
        ChatError::Transport {
            provider,
            source: TransportError::Status {
                status, message, ..
            },
        } => {
            assert_eq!(provider, Provider::OpenAi);
            assert_eq!(status, 429);
            assert_eq!(message, "Rate limit reached (rate_limit_exceeded)");
        }
        other => panic!("unexpected error type: {other:?}"),
    }
}

#[tokio::test]
async fn openai_malformed_body_is_a_decode_error() {
    let transport = MockTransport::new()
        .route(
            ENDPOINT,
            Reply::Body {
                status: 200,
                headers: Default::default(),
                body: "<html>gateway</html>".to_string(),
            },
        )
        .into_shared();

    let err = client(transport)
        .chat(Provider::OpenAi, ChatRequest::from_prompt("gpt-4o-mini", "hi"))
        .await
        .expect_err("should fail to decode");
    assert!(!err.is_retryable());
    match err {
        ChatError::Transport {
            source: TransportError::Decode { .. },
            ..
        } => {}
        other => panic!("unexpected error type: {other:?}"),
    }
}

#[tokio::test]
async fn openai_network_failure_is_retryable() {
    let transport = MockTransport::new()
        .route(ENDPOINT, Reply::Network("connection refused".to_string()))
        .into_shared();

    let err = client(transport)
        .chat(Provider::OpenAi, ChatRequest::from_prompt("gpt-4o-mini", "hi"))
        .await
        .expect_err("should fail");
    assert!(err.is_retryable());
    assert_eq!(err.provider(), "openai");
}
