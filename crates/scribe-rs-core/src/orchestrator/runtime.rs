//! Turn execution: drives the turn machine against the model and dispatcher.

use super::machine::{TurnEvent, TurnInput, TurnMachine};
use super::model::{assistant_message, to_chat_messages, to_chat_tools, to_invocation};
use super::prompt::PromptBuilder;
use crate::error::OrchestratorError;
use crate::orchestrator::RunResult;
use autoagents_llm::LLMProvider;
use autoagents_llm::ToolCall;
use autoagents_llm::chat::{ChatMessage, StreamChunk, Tool};
use futures_util::StreamExt;
use log::{debug, error, info};
use scribe_rs_protocol::{
    ContentBlock, EventMsg, EventPayload, EventSink, Message, Role, ToolInvocation, TurnId,
};
use scribe_rs_tools::ToolDispatcher;
use std::collections::VecDeque;
use std::sync::Arc;

/// Parameters for a single turn execution.
pub(crate) struct TurnParams {
    pub(crate) turn_id: TurnId,
    pub(crate) conversation: Vec<Message>,
    /// When set, the model is streamed and every event goes here.
    pub(crate) event_sink: Option<Arc<dyn EventSink>>,
}

/// What the model said in one round.
struct ModelReply {
    text: String,
    invocations: Vec<ToolInvocation>,
}

/// Executes turns with prompt assembly and tool dispatch.
pub(crate) struct TurnExecutor {
    llm: Arc<dyn LLMProvider>,
    dispatcher: ToolDispatcher,
    prompt_builder: PromptBuilder,
    max_rounds: usize,
}

impl TurnExecutor {
    pub(crate) fn new(
        llm: Arc<dyn LLMProvider>,
        dispatcher: ToolDispatcher,
        prompt_builder: PromptBuilder,
        max_rounds: usize,
    ) -> Self {
        Self {
            llm,
            dispatcher,
            prompt_builder,
            max_rounds,
        }
    }

    /// Execute a single turn end-to-end.
    pub(crate) async fn run_turn(&self, params: TurnParams) -> Result<RunResult, OrchestratorError> {
        let TurnParams {
            turn_id,
            mut conversation,
            event_sink,
        } = params;
        info!(
            "starting turn (turn_id={}, messages={}, stream={})",
            turn_id,
            conversation.len(),
            event_sink.is_some()
        );

        let system_prompt = self
            .prompt_builder
            .build_system_prompt(&latest_user_text(&conversation))
            .await;
        let dispatcher = self.dispatcher.for_turn(turn_id);
        let tools = to_chat_tools(&dispatcher.catalog());
        let emitter = Emitter {
            turn_id,
            sink: event_sink,
        };

        let mut machine = TurnMachine::new(self.max_rounds);
        let mut events: VecDeque<TurnEvent> = machine.advance(TurnInput::Begin)?.into();
        let mut round_results: Vec<ContentBlock> = Vec::new();

        while let Some(event) = events.pop_front() {
            match event {
                TurnEvent::RoundStarted { round } => {
                    flush_results(&mut conversation, &mut round_results);
                    let messages = to_chat_messages(&system_prompt, &conversation);
                    let reply = match self.call_model(&messages, &tools, &emitter).await {
                        Ok(reply) => reply,
                        Err(err) => {
                            error!("model call failed (turn_id={}, round={}): {}", turn_id, round, err);
                            emitter.emit(EventPayload::Error {
                                message: err.to_string(),
                            });
                            return Err(err);
                        }
                    };
                    conversation.push(assistant_message(&reply.text, &reply.invocations));
                    events.extend(machine.advance(TurnInput::ModelReplied {
                        text: reply.text,
                        invocations: reply.invocations,
                    })?);
                }
                TurnEvent::ToolStart(invocation) => {
                    emitter.emit(EventPayload::ToolStart {
                        name: invocation.name.clone(),
                        input: invocation.input.clone(),
                    });
                    let outcome = dispatcher
                        .execute(&invocation.name, invocation.input)
                        .await;
                    events.extend(machine.advance(TurnInput::ToolFinished(outcome))?);
                }
                TurnEvent::ToolDone { invocation, result } => {
                    emitter.emit(EventPayload::ToolDone {
                        name: result.tool_name.clone(),
                        result: result.result_text.clone(),
                        success: result.success,
                    });
                    round_results.push(ContentBlock::ToolResult {
                        tool_use_id: invocation.id,
                        content: result.result_text,
                        is_error: !result.success,
                    });
                }
                TurnEvent::Finished { text, ceiling_hit } => {
                    flush_results(&mut conversation, &mut round_results);
                    let tool_results = machine.tool_results().to_vec();
                    emitter.emit(EventPayload::Summary {
                        text: text.clone(),
                        tool_results: tool_results.clone(),
                        rounds: machine.rounds(),
                        ceiling_hit,
                    });
                    info!(
                        "turn finished (turn_id={}, rounds={}, tool_results={}, ceiling_hit={})",
                        turn_id,
                        machine.rounds(),
                        tool_results.len(),
                        ceiling_hit
                    );
                    return Ok(RunResult {
                        turn_id,
                        text,
                        tool_results,
                        rounds: machine.rounds(),
                        ceiling_hit,
                        messages: conversation,
                    });
                }
            }
        }

        Err(OrchestratorError::InvalidTransition(
            "turn ended without a final answer".to_string(),
        ))
    }

    async fn call_model(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
        emitter: &Emitter,
    ) -> Result<ModelReply, OrchestratorError> {
        let tools = (!tools.is_empty()).then_some(tools);
        if !emitter.is_streaming() {
            let response = self
                .llm
                .chat_with_tools(messages, tools, None)
                .await
                .map_err(|err| OrchestratorError::Model(err.to_string()))?;
            return Ok(reply_from_parts(
                response.text().unwrap_or_default(),
                response.tool_calls().unwrap_or_default(),
            ));
        }

        let mut stream = self
            .llm
            .chat_stream_with_tools(messages, tools, None)
            .await
            .map_err(|err| OrchestratorError::Model(err.to_string()))?;
        let mut text = String::new();
        let mut calls = Vec::new();
        while let Some(chunk) = stream.next().await {
            match chunk.map_err(|err| OrchestratorError::Model(err.to_string()))? {
                StreamChunk::Text(delta) => {
                    if delta.is_empty() {
                        continue;
                    }
                    emitter.emit(EventPayload::Token {
                        text: delta.clone(),
                    });
                    text.push_str(&delta);
                }
                StreamChunk::ToolUseComplete { tool_call, .. } => calls.push(tool_call),
                _ => {}
            }
        }
        Ok(reply_from_parts(text, calls))
    }
}

fn reply_from_parts(text: String, calls: Vec<ToolCall>) -> ModelReply {
    let invocations = calls.into_iter().map(to_invocation).collect::<Vec<_>>();
    debug!(
        "model replied (text_len={}, tool_calls={})",
        text.len(),
        invocations.len()
    );
    ModelReply { text, invocations }
}

/// Tool results of a round go back to the model as one user message.
fn flush_results(conversation: &mut Vec<Message>, results: &mut Vec<ContentBlock>) {
    if results.is_empty() {
        return;
    }
    conversation.push(Message {
        role: Role::User,
        content: std::mem::take(results),
    });
}

fn latest_user_text(conversation: &[Message]) -> String {
    conversation
        .iter()
        .rev()
        .filter(|message| message.role == Role::User)
        .map(Message::text)
        .find(|text| !text.trim().is_empty())
        .unwrap_or_default()
}

/// Stamps payloads with the turn id and forwards them to the sink, if any.
struct Emitter {
    turn_id: TurnId,
    sink: Option<Arc<dyn EventSink>>,
}

impl Emitter {
    fn is_streaming(&self) -> bool {
        self.sink.is_some()
    }

    fn emit(&self, payload: EventPayload) {
        if let Some(sink) = &self.sink {
            sink.emit(EventMsg::new(self.turn_id, payload));
        }
    }
}
