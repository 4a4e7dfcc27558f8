use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use crate::error::ChatError;
use crate::provider::{
    encode_object, image_media_type, merge_options, parse_arguments, prompt_message,
};
use crate::types::{ChatRequest, Message, Provider, Role, Tool, ToolChoice};

use super::types::{
    AnthropicContentBlock, AnthropicImageSource, AnthropicMessage, AnthropicMessagesRequest,
    AnthropicTool,
};

const PROVIDER: Provider = Provider::Anthropic;

pub(crate) fn build_anthropic_request(
    request: &ChatRequest,
    default_max_tokens: u32,
) -> Result<AnthropicMessagesRequest, ChatError> {
    let prompt = prompt_message(request);

    // system 字段与 system 角色消息折叠为顶层 system
    let mut system_texts: Vec<&str> = Vec::new();
    if let Some(system) = request.system.as_deref().filter(|system| !system.is_empty()) {
        system_texts.push(system);
    }

    let mut messages: Vec<AnthropicMessage> = Vec::with_capacity(request.messages.len() + 1);
    for message in request.messages.iter().chain(prompt.as_ref()) {
        if message.role == Role::System {
            if !message.content.is_empty() {
                system_texts.push(&message.content);
            }
            continue;
        }
        let role = match message.role {
            Role::Assistant => "assistant",
            _ => "user",
        };
        let blocks = convert_blocks(message)?;
        // 连续同角色消息合并 保证 user/assistant 交替
        match messages.last_mut() {
            Some(last) if last.role == role => last.content.extend(blocks),
            _ => messages.push(AnthropicMessage {
                role: role.to_string(),
                content: blocks,
            }),
        }
    }

    if messages.is_empty() {
        return Err(ChatError::translation(
            PROVIDER,
            "at least one non-system message is required",
        ));
    }

    let mut native = AnthropicMessagesRequest {
        model: request.model.clone(),
        messages,
        max_tokens: request.max_tokens.unwrap_or(default_max_tokens),
        system: (!system_texts.is_empty()).then(|| system_texts.join("\n\n")),
        temperature: request.temperature,
        top_p: request.top_p,
        top_k: request.top_k,
        stop_sequences: request.stop_sequences.clone(),
        tools: request.tools.iter().map(convert_tool).collect(),
        tool_choice: request.tool_choice.as_ref().map(convert_tool_choice),
        metadata: build_metadata(request),
        extra: Map::new(),
    };

    if !request.options.is_empty() {
        let occupied = encode_object(PROVIDER, &native)?;
        native.extra = merge_options(&occupied, &request.options);
    }
    Ok(native)
}

fn convert_blocks(message: &Message) -> Result<Vec<AnthropicContentBlock>, ChatError> {
    if message.role == Role::Tool {
        let tool_use_id = message.tool_call_id.clone().ok_or_else(|| {
            ChatError::translation(PROVIDER, "tool message requires a tool_call_id")
        })?;
        return Ok(vec![AnthropicContentBlock::ToolResult {
            tool_use_id,
            content: message.content.clone(),
        }]);
    }

    let mut blocks = Vec::with_capacity(1 + message.images.len() + message.tool_calls.len());
    for image in &message.images {
        blocks.push(AnthropicContentBlock::Image {
            source: AnthropicImageSource {
                kind: "base64".to_string(),
                media_type: image_media_type(image).to_string(),
                data: image.clone(),
            },
        });
    }
    if !message.content.is_empty() {
        blocks.push(AnthropicContentBlock::Text {
            text: message.content.clone(),
        });
    }
    for call in &message.tool_calls {
        blocks.push(AnthropicContentBlock::ToolUse {
            id: call.id.clone(),
            name: call.function.name.clone(),
            input: parse_arguments(PROVIDER, &call.function.arguments)?,
        });
    }
    Ok(blocks)
}

fn convert_tool(tool: &Tool) -> AnthropicTool {
    AnthropicTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool
            .parameters
            .clone()
            .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
    }
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::None => json!({ "type": "none" }),
        ToolChoice::Auto => json!({ "type": "auto" }),
        ToolChoice::Required => json!({ "type": "any" }),
        ToolChoice::Tool { name } => json!({ "type": "tool", "name": name }),
    }
}

/// Anthropic only accepts `user_id` inside `metadata`.
fn build_metadata(request: &ChatRequest) -> Option<BTreeMap<String, String>> {
    request
        .metadata
        .as_ref()
        .and_then(|metadata| metadata.get("user_id").cloned())
        .or_else(|| request.user.clone())
        .map(|user_id| BTreeMap::from([("user_id".to_string(), user_id)]))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::types::ToolCall;

    #[test]
    fn defaults_max_tokens_and_folds_system() {
        let request = ChatRequest {
            system: Some("你是一个有帮助的助手。".to_string()),
            ..ChatRequest::new(
                "claude-3-5-sonnet-latest",
                vec![Message::system("请用简体中文回答。"), Message::user("你好")],
            )
        };

        let native = build_anthropic_request(&request, 1024).expect("native request");
        let body = serde_json::to_value(&native).expect("serialize");
        assert_eq!(
            body,
            json!({
                "model": "claude-3-5-sonnet-latest",
                "max_tokens": 1024,
                "system": "你是一个有帮助的助手。\n\n请用简体中文回答。",
                "messages": [
                    { "role": "user", "content": [{ "type": "text", "text": "你好" }] }
                ]
            })
        );
    }

    #[test]
    fn maps_sampling_controls_and_user() {
        let request = ChatRequest {
            max_tokens: Some(300),
            temperature: Some(0.4),
            top_p: Some(0.8),
            top_k: Some(5),
            stop_sequences: vec!["\n\nHuman:".to_string()],
            user: Some("user-7".to_string()),
            metadata: Some(HashMap::from([("trace".to_string(), "t-1".to_string())])),
            presence_penalty: Some(1.0),
            seed: Some(3),
            logprobs: Some(true),
            ..ChatRequest::from_prompt("claude-3-haiku", "hi")
        };

        let body = serde_json::to_value(build_anthropic_request(&request, 1024).expect("native"))
            .expect("serialize");
        assert_eq!(
            body,
            json!({
                "model": "claude-3-haiku",
                "max_tokens": 300,
                "temperature": 0.4,
                "top_p": 0.8,
                "top_k": 5,
                "stop_sequences": ["\n\nHuman:"],
                "metadata": { "user_id": "user-7" },
                "messages": [
                    { "role": "user", "content": [{ "type": "text", "text": "hi" }] }
                ]
            })
        );
    }

    #[test]
    fn metadata_user_id_wins_over_user() {
        let request = ChatRequest {
            user: Some("from-user".to_string()),
            metadata: Some(HashMap::from([(
                "user_id".to_string(),
                "from-metadata".to_string(),
            )])),
            ..ChatRequest::from_prompt("claude-3-haiku", "hi")
        };
        let native = build_anthropic_request(&request, 1024).expect("native");
        assert_eq!(
            native.metadata,
            Some(BTreeMap::from([(
                "user_id".to_string(),
                "from-metadata".to_string()
            )]))
        );
    }

    #[test]
    fn tool_turns_become_tool_use_and_tool_result_blocks() {
        let call = ToolCall::function("toolu_01", "get_weather", r#"{"city":"Tokyo"}"#);
        let request = ChatRequest {
            tools: vec![Tool {
                name: "get_weather".to_string(),
                description: Some("Get the weather".to_string()),
                parameters: None,
            }],
            tool_choice: Some(ToolChoice::Required),
            ..ChatRequest::new(
                "claude-3-5-sonnet-latest",
                vec![
                    Message::user("weather in Tokyo?"),
                    Message::assistant("Let me check.").with_tool_calls(vec![call]),
                    Message::tool_result("toolu_01", "22C and clear"),
                    Message::user("thanks, and tomorrow?"),
                ],
            )
        };

        let body = serde_json::to_value(build_anthropic_request(&request, 1024).expect("native"))
            .expect("serialize");
        assert_eq!(
            body["messages"],
            json!([
                { "role": "user", "content": [{ "type": "text", "text": "weather in Tokyo?" }] },
                { "role": "assistant", "content": [
                    { "type": "text", "text": "Let me check." },
                    { "type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": { "city": "Tokyo" } }
                ] },
                { "role": "user", "content": [
                    { "type": "tool_result", "tool_use_id": "toolu_01", "content": "22C and clear" },
                    { "type": "text", "text": "thanks, and tomorrow?" }
                ] }
            ])
        );
        assert_eq!(body["tool_choice"], json!({ "type": "any" }));
        assert_eq!(
            body["tools"],
            json!([{
                "name": "get_weather",
                "description": "Get the weather",
                "input_schema": { "type": "object", "properties": {} }
            }])
        );
    }

    #[test]
    fn tool_message_without_id_fails_translation() {
        let mut message = Message::tool_result("x", "result");
        message.tool_call_id = None;
        message.name = Some("get_weather".to_string());
        let request = ChatRequest::new("claude-3-haiku", vec![Message::user("hi"), message]);

        let err = build_anthropic_request(&request, 1024).expect_err("should fail");
        match err {
            ChatError::Translation { provider, message } => {
                assert_eq!(provider, Provider::Anthropic);
                assert!(message.contains("tool_call_id"), "unexpected message: {message}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn system_only_conversation_fails_translation() {
        let request = ChatRequest::new("claude-3-haiku", vec![Message::system("be nice")]);

        let err = build_anthropic_request(&request, 1024).expect_err("should fail");
        match err {
            ChatError::Translation { provider, message } => {
                assert_eq!(provider, Provider::Anthropic);
                assert!(message.contains("non-system"), "unexpected message: {message}");
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn images_become_base64_blocks() {
        let request = ChatRequest::new(
            "claude-3-5-sonnet-latest",
            vec![Message::user("describe").with_image("iVBORw0KGgo=")],
        );
        let body = serde_json::to_value(build_anthropic_request(&request, 1024).expect("native"))
            .expect("serialize");
        assert_eq!(
            body["messages"][0]["content"][0],
            json!({
                "type": "image",
                "source": { "type": "base64", "media_type": "image/png", "data": "iVBORw0KGgo=" }
            })
        );
    }

    #[test]
    fn option_bag_cannot_replace_max_tokens() {
        let request = ChatRequest::from_prompt("claude-3-haiku", "hi")
            .with_option("max_tokens", 9_i64)
            .with_option("service_tier", "auto");
        let body = serde_json::to_value(build_anthropic_request(&request, 2048).expect("native"))
            .expect("serialize");
        assert_eq!(body["max_tokens"], json!(2048));
        assert_eq!(body["service_tier"], json!("auto"));
    }
}
