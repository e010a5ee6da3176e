use async_trait::async_trait;
use autoagents_llm::chat::{
    ChatMessage, ChatProvider, ChatResponse, StreamChunk, StructuredOutputFormat, Tool,
};
use autoagents_llm::completion::{CompletionProvider, CompletionRequest, CompletionResponse};
use autoagents_llm::embedding::EmbeddingProvider;
use autoagents_llm::error::LLMError;
use autoagents_llm::models::ModelsProvider;
use autoagents_llm::{FunctionCall, LLMProvider, ToolCall};
use futures_util::Stream;
use futures_util::stream;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

type LlmStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, LLMError>> + Send>>;

/// Build a function tool call with JSON arguments.
pub fn tool_call(id: impl Into<String>, name: impl Into<String>, args: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        call_type: "function".to_string(),
        function: FunctionCall {
            name: name.into(),
            arguments: args.to_string(),
        },
    }
}

#[derive(Debug, Clone)]
pub struct FixedChatResponse {
    text: String,
    tool_calls: Option<Vec<ToolCall>>,
}

impl FixedChatResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: None,
        }
    }

    pub fn with_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Some(tool_calls),
        }
    }
}

impl std::fmt::Display for FixedChatResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text)
    }
}

impl ChatResponse for FixedChatResponse {
    fn text(&self) -> Option<String> {
        Some(self.text.clone())
    }

    fn tool_calls(&self) -> Option<Vec<ToolCall>> {
        self.tool_calls.clone()
    }
}

/// Completion and embedding are never used by the orchestrator.
macro_rules! unused_providers {
    ($llm:ty) => {
        #[async_trait]
        impl CompletionProvider for $llm {
            async fn complete(
                &self,
                _req: &CompletionRequest,
                _json_schema: Option<StructuredOutputFormat>,
            ) -> Result<CompletionResponse, LLMError> {
                Err(LLMError::ProviderError("completion not scripted".to_string()))
            }
        }

        #[async_trait]
        impl EmbeddingProvider for $llm {
            async fn embed(&self, input: Vec<String>) -> Result<Vec<Vec<f32>>, LLMError> {
                Ok(input.into_iter().map(|_| vec![0.0, 0.0]).collect())
            }
        }

        #[async_trait]
        impl ModelsProvider for $llm {}

        impl LLMProvider for $llm {}
    };
}

/// One scripted model turn.
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tools(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            text: text.into(),
            tool_calls,
        }
    }

    fn into_response(self) -> FixedChatResponse {
        if self.tool_calls.is_empty() {
            FixedChatResponse::new(self.text)
        } else {
            FixedChatResponse::with_tool_calls(self.text, self.tool_calls)
        }
    }

    /// Text split at word boundaries, then one completed chunk per tool call.
    fn into_chunks(self) -> Vec<Result<StreamChunk, LLMError>> {
        let mut chunks = self
            .text
            .split_inclusive(' ')
            .map(|word| Ok(StreamChunk::Text(word.to_string())))
            .collect::<Vec<_>>();
        chunks.extend(
            self.tool_calls
                .into_iter()
                .enumerate()
                .map(|(index, tool_call)| Ok(StreamChunk::ToolUseComplete { index, tool_call })),
        );
        chunks
    }
}

/// Replays a fixed list of replies and records every request it saw.
#[derive(Debug, Clone)]
pub struct ScriptedLLM {
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    /// Messages sent on each call, in call order.
    pub requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    /// Tool names offered on the latest call.
    pub seen_tools: Arc<Mutex<Vec<String>>>,
}

impl ScriptedLLM {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            requests: Arc::new(Mutex::new(Vec::new())),
            seen_tools: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
    ) -> Result<ScriptedReply, LLMError> {
        self.requests.lock().push(messages.to_vec());
        *self.seen_tools.lock() = tools
            .unwrap_or(&[])
            .iter()
            .map(|tool| tool.function.name.clone())
            .collect();
        self.replies
            .lock()
            .pop_front()
            .ok_or_else(|| LLMError::ProviderError("script exhausted".to_string()))
    }
}

#[async_trait]
impl ChatProvider for ScriptedLLM {
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        let reply = self.next_reply(messages, tools)?;
        Ok(Box::new(reply.into_response()))
    }

    async fn chat_stream_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        let reply = self.next_reply(messages, tools)?;
        Ok(Box::pin(stream::iter(reply.into_chunks())))
    }
}

unused_providers!(ScriptedLLM);

/// Requests the same tool on every call, forever.
#[derive(Debug, Clone)]
pub struct AlwaysToolLLM {
    tool: String,
    args: Value,
    calls: Arc<AtomicUsize>,
}

impl AlwaysToolLLM {
    pub fn new(tool: impl Into<String>, args: Value) -> Self {
        Self {
            tool: tool.into(),
            args,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self) -> ScriptedReply {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        ScriptedReply::with_tools(
            format!("Step {call}."),
            vec![tool_call(format!("call_{call}"), &self.tool, self.args.clone())],
        )
    }
}

#[async_trait]
impl ChatProvider for AlwaysToolLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Ok(Box::new(self.next_reply().into_response()))
    }

    async fn chat_stream_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        Ok(Box::pin(stream::iter(self.next_reply().into_chunks())))
    }
}

unused_providers!(AlwaysToolLLM);

#[derive(Debug, Clone)]
pub struct FailingLLM {
    message: String,
}

impl FailingLLM {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ChatProvider for FailingLLM {
    async fn chat_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<Box<dyn ChatResponse>, LLMError> {
        Err(LLMError::ProviderError(self.message.clone()))
    }

    async fn chat_stream_with_tools(
        &self,
        _messages: &[ChatMessage],
        _tools: Option<&[Tool]>,
        _json_schema: Option<StructuredOutputFormat>,
    ) -> Result<LlmStream, LLMError> {
        Err(LLMError::ProviderError(self.message.clone()))
    }
}

unused_providers!(FailingLLM);
