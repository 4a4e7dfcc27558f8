use serde_json::Value;

use crate::types::{
    ChatResponse, Choice, FinishReason, FunctionCall, Message, Provider, Role, ToolCall, Usage,
};

use super::types::{OllamaChatResponse, OllamaToolCall};

pub(crate) fn map_response(response: OllamaChatResponse, provider: Provider) -> ChatResponse {
    let message = response.message.unwrap_or_default();
    let tool_calls = message
        .tool_calls
        .into_iter()
        .enumerate()
        .map(|(index, call)| convert_tool_call(index, call))
        .collect();

    let choice = Choice {
        index: 0,
        message: Message {
            content: message.content,
            tool_calls,
            ..Message::new(Role::Assistant, String::new())
        },
        finish_reason: FinishReason::from_native(response.done_reason.as_deref()),
        logprobs: None,
    };

    ChatResponse {
        id: None,
        model: response.model,
        provider,
        choices: vec![choice],
        usage: Usage::from_counts(response.prompt_eval_count, response.eval_count, None),
    }
}

fn convert_tool_call(index: usize, call: OllamaToolCall) -> ToolCall {
    let arguments = match call.function.arguments {
        Value::Null => "{}".to_string(),
        Value::String(raw) => raw,
        other => other.to_string(),
    };
    ToolCall {
        id: call.id.unwrap_or_else(|| format!("call_{index}")),
        kind: "function".to_string(),
        function: FunctionCall {
            name: call.function.name,
            arguments,
        },
    }
}
