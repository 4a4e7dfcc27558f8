use serde_json::{Map, Value, json};

use crate::error::ChatError;
use crate::provider::{merge_options, parse_arguments, prompt_message};
use crate::types::{ChatRequest, Message, Provider, ResponseFormat, Role, Tool, ToolCall};

use super::types::{
    OllamaChatRequest, OllamaFunction, OllamaFunctionCall, OllamaMessage, OllamaTool,
    OllamaToolCall,
};

const PROVIDER: Provider = Provider::Ollama;

pub(crate) fn build_ollama_request(request: &ChatRequest) -> Result<OllamaChatRequest, ChatError> {
    let mut messages = Vec::with_capacity(request.messages.len() + 2);
    if let Some(system) = request.system.as_deref().filter(|system| !system.is_empty()) {
        messages.push(OllamaMessage {
            role: Role::System.as_str().to_string(),
            content: system.to_string(),
            ..OllamaMessage::default()
        });
    }
    for message in &request.messages {
        messages.push(convert_message(message)?);
    }
    if let Some(prompt) = prompt_message(request) {
        messages.push(convert_message(&prompt)?);
    }

    let mut options = build_options(request);
    let extra = merge_options(&options, &request.options);
    options.extend(extra);

    Ok(OllamaChatRequest {
        model: request.model.clone(),
        messages,
        tools: request.tools.iter().map(convert_tool).collect(),
        format: request.response_format.as_ref().and_then(convert_format),
        options,
        stream: true,
        keep_alive: request.keep_alive.clone(),
    })
}

fn build_options(request: &ChatRequest) -> Map<String, Value> {
    let mut options = Map::new();
    if let Some(temperature) = request.temperature {
        options.insert("temperature".to_string(), Value::from(temperature));
    }
    if let Some(top_p) = request.top_p {
        options.insert("top_p".to_string(), Value::from(top_p));
    }
    if let Some(top_k) = request.top_k {
        options.insert("top_k".to_string(), Value::from(top_k));
    }
    if let Some(max_tokens) = request.max_tokens {
        options.insert("num_predict".to_string(), Value::from(max_tokens));
    }
    if let Some(penalty) = request.presence_penalty {
        options.insert("presence_penalty".to_string(), Value::from(penalty));
    }
    if let Some(penalty) = request.frequency_penalty {
        options.insert("frequency_penalty".to_string(), Value::from(penalty));
    }
    if let Some(seed) = request.seed {
        options.insert("seed".to_string(), Value::from(seed));
    }
    if !request.stop_sequences.is_empty() {
        options.insert(
            "stop".to_string(),
            Value::from(request.stop_sequences.clone()),
        );
    }
    options
}

fn convert_message(message: &Message) -> Result<OllamaMessage, ChatError> {
    let tool_calls = message
        .tool_calls
        .iter()
        .map(convert_tool_call)
        .collect::<Result<Vec<_>, _>>()?;
    let tool_name = match message.role {
        Role::Tool => message.name.clone(),
        _ => None,
    };
    Ok(OllamaMessage {
        role: message.role.as_str().to_string(),
        content: message.content.clone(),
        images: message.images.clone(),
        tool_calls,
        tool_name,
    })
}

fn convert_tool_call(call: &ToolCall) -> Result<OllamaToolCall, ChatError> {
    Ok(OllamaToolCall {
        id: Some(call.id.clone()).filter(|id| !id.is_empty()),
        function: OllamaFunctionCall {
            name: call.function.name.clone(),
            arguments: parse_arguments(PROVIDER, &call.function.arguments)?,
        },
    })
}

fn convert_tool(tool: &Tool) -> OllamaTool {
    OllamaTool {
        kind: "function".to_string(),
        function: OllamaFunction {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: tool
                .parameters
                .clone()
                .unwrap_or_else(|| json!({ "type": "object", "properties": {} })),
        },
    }
}

fn convert_format(format: &ResponseFormat) -> Option<Value> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::JsonObject => Some(Value::String("json".to_string())),
        ResponseFormat::JsonSchema { schema, .. } => Some(schema.clone()),
    }
}
