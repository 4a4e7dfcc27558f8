use crate::types::{
    ChatResponse, Choice, FinishReason, FunctionCall, Message, Provider, Role, ToolCall, Usage,
};

use super::types::{AnthropicMessagesResponse, AnthropicResponseBlock};

/// Text blocks are concatenated in order; `tool_use` blocks become tool calls and every
/// other block kind is ignored.
pub(crate) fn map_response(response: AnthropicMessagesResponse, provider: Provider) -> ChatResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in response.content {
        match block.kind.as_str() {
            "text" => content.push_str(block.text.as_deref().unwrap_or_default()),
            "tool_use" => tool_calls.push(convert_tool_use(block)),
            _ => {}
        }
    }

    let usage = response
        .usage
        .and_then(|usage| Usage::from_counts(usage.input_tokens, usage.output_tokens, None));

    ChatResponse {
        id: response.id,
        model: response.model,
        provider,
        choices: vec![Choice {
            index: 0,
            message: Message {
                content,
                tool_calls,
                ..Message::new(Role::Assistant, String::new())
            },
            finish_reason: FinishReason::from_native(response.stop_reason.as_deref()),
            logprobs: None,
        }],
        usage,
    }
}

fn convert_tool_use(block: AnthropicResponseBlock) -> ToolCall {
    let arguments = block
        .input
        .map(|input| input.to_string())
        .unwrap_or_else(|| "{}".to_string());
    ToolCall {
        id: block.id.unwrap_or_default(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: block.name.unwrap_or_default(),
            arguments,
        },
    }
}
