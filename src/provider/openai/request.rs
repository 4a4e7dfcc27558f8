use serde_json::{Map, Value, json};

use crate::error::ChatError;
use crate::provider::{encode_object, image_media_type, merge_options, prompt_message};
use crate::types::{ChatRequest, Message, Provider, ResponseFormat, Tool, ToolChoice};

use super::types::{
    OpenAiChatRequest, OpenAiContent, OpenAiContentPart, OpenAiFunction, OpenAiFunctionCall,
    OpenAiImageUrl, OpenAiMessage, OpenAiTool, OpenAiToolCall,
};

const PROVIDER: Provider = Provider::OpenAi;

pub(crate) fn build_openai_request(request: &ChatRequest) -> Result<OpenAiChatRequest, ChatError> {
    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    if let Some(system) = request.system.as_deref().filter(|system| !system.is_empty()) {
        messages.push(convert_message(&Message::system(system)));
    }
    messages.extend(request.messages.iter().map(convert_message));
    if let Some(prompt) = prompt_message(request) {
        messages.push(convert_message(&prompt));
    }

    let mut native = OpenAiChatRequest {
        model: request.model.clone(),
        messages,
        temperature: request.temperature,
        top_p: request.top_p,
        max_completion_tokens: request.max_tokens,
        stop: request.stop_sequences.clone(),
        presence_penalty: request.presence_penalty,
        frequency_penalty: request.frequency_penalty,
        seed: request.seed,
        logprobs: request.logprobs,
        top_logprobs: request.top_logprobs,
        response_format: request.response_format.as_ref().map(convert_response_format),
        tools: request.tools.iter().map(convert_tool).collect(),
        tool_choice: request.tool_choice.as_ref().map(convert_tool_choice),
        logit_bias: request
            .logit_bias
            .as_ref()
            .map(|bias| bias.iter().map(|(k, v)| (k.clone(), *v)).collect()),
        user: request.user.clone(),
        metadata: request
            .metadata
            .as_ref()
            .map(|meta| meta.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        stream: false,
        extra: Map::new(),
    };

    if !request.options.is_empty() {
        let mut occupied = encode_object(PROVIDER, &native)?;
        // legacy spelling of max_completion_tokens; OpenAI rejects bodies carrying both
        if native.max_completion_tokens.is_some() {
            occupied.insert("max_tokens".to_string(), Value::Null);
        }
        native.extra = merge_options(&occupied, &request.options);
    }
    Ok(native)
}

fn convert_message(message: &Message) -> OpenAiMessage {
    let content = if !message.images.is_empty() {
        let mut parts = Vec::with_capacity(message.images.len() + 1);
        if !message.content.is_empty() {
            parts.push(OpenAiContentPart::Text {
                text: message.content.clone(),
            });
        }
        parts.extend(message.images.iter().map(|image| OpenAiContentPart::ImageUrl {
            image_url: OpenAiImageUrl {
                url: format!("data:{};base64,{image}", image_media_type(image)),
            },
        }));
        Some(OpenAiContent::Parts(parts))
    } else if message.content.is_empty() && !message.tool_calls.is_empty() {
        None
    } else {
        Some(OpenAiContent::Text(message.content.clone()))
    };

    OpenAiMessage {
        role: message.role.as_str().to_string(),
        content,
        name: message.name.clone(),
        tool_call_id: message.tool_call_id.clone(),
        tool_calls: message
            .tool_calls
            .iter()
            .map(|call| OpenAiToolCall {
                id: call.id.clone(),
                kind: call.kind.clone(),
                function: OpenAiFunctionCall {
                    name: call.function.name.clone(),
                    arguments: call.function.arguments.clone(),
                },
            })
            .collect(),
    }
}

fn convert_tool(tool: &Tool) -> OpenAiTool {
    OpenAiTool {
        kind: "function".to_string(),
        function: OpenAiFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool.parameters.clone(),
        },
    }
}

fn convert_tool_choice(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::None => Value::String("none".to_string()),
        ToolChoice::Auto => Value::String("auto".to_string()),
        ToolChoice::Required => Value::String("required".to_string()),
        ToolChoice::Tool { name } => json!({ "type": "function", "function": { "name": name } }),
    }
}

fn convert_response_format(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({ "type": "text" }),
        ResponseFormat::JsonObject => json!({ "type": "json_object" }),
        ResponseFormat::JsonSchema {
            name,
            schema,
            strict,
        } => {
            let mut json_schema = Map::new();
            json_schema.insert("name".to_string(), Value::String(name.clone()));
            json_schema.insert("schema".to_string(), schema.clone());
            if let Some(strict) = strict {
                json_schema.insert("strict".to_string(), Value::Bool(*strict));
            }
            json!({ "type": "json_schema", "json_schema": json_schema })
        }
    }
}
