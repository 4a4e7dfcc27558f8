use crate::error::ChatError;
use crate::types::{
    ChatResponse, Choice, FinishReason, FunctionCall, LogProbs, Message, Provider, Role,
    TokenLogProb, ToolCall, TopLogProb, Usage,
};

use super::types::{OpenAiChatResponse, OpenAiLogProbs, OpenAiToolCall, OpenAiUsage};

pub(crate) fn map_response(
    response: OpenAiChatResponse,
    provider: Provider,
) -> Result<ChatResponse, ChatError> {
    let choice = response.choices.into_iter().next().ok_or_else(|| {
        ChatError::translation(Provider::OpenAi, "response contained no choices")
    })?;

    let message = choice.message;
    let content = message
        .content
        .filter(|content| !content.is_empty())
        .or(message.refusal)
        .unwrap_or_default();
    let tool_calls = message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(convert_tool_call)
        .collect();

    Ok(ChatResponse {
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
            finish_reason: FinishReason::from_native(choice.finish_reason.as_deref()),
            logprobs: choice.logprobs.and_then(convert_logprobs),
        }],
        usage: response.usage.and_then(convert_usage),
    })
}

fn convert_tool_call(call: OpenAiToolCall) -> ToolCall {
    ToolCall {
        id: call.id,
        kind: call.kind,
        function: FunctionCall {
            name: call.function.name,
            arguments: call.function.arguments,
        },
    }
}

fn convert_logprobs(logprobs: OpenAiLogProbs) -> Option<LogProbs> {
    let content = logprobs.content?;
    Some(LogProbs {
        content: content
            .into_iter()
            .map(|token| TokenLogProb {
                token: token.token,
                logprob: token.logprob,
                bytes: token.bytes,
                top_logprobs: token
                    .top_logprobs
                    .into_iter()
                    .map(|top| TopLogProb {
                        token: top.token,
                        logprob: top.logprob,
                        bytes: top.bytes,
                    })
                    .collect(),
            })
            .collect(),
    })
}

pub(crate) fn convert_usage(usage: OpenAiUsage) -> Option<Usage> {
    Usage::from_counts(
        usage.prompt_tokens,
        usage.completion_tokens,
        usage.total_tokens,
    )
}
