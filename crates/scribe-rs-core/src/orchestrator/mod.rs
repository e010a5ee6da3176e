//! Conversation orchestrator.

pub mod machine;
mod model;
pub mod prompt;
mod runtime;

use crate::error::OrchestratorError;
use autoagents_llm::LLMProvider;
use log::{debug, info};
use prompt::PromptBuilder;
use runtime::{TurnExecutor, TurnParams};
use scribe_rs_config::OrchestratorConfig;
use scribe_rs_context::ContextProvider;
use scribe_rs_protocol::{EventMsg, EventSink, Message, ToolResult, TurnId};
use scribe_rs_tools::ToolDispatcher;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;

const RUN_STREAM_BUFFER: usize = 512;

/// Result payload for a single run invocation.
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Turn that produced the response.
    pub turn_id: TurnId,
    /// Final assistant text.
    pub text: String,
    /// Every tool invocation of the turn, in dispatch order.
    pub tool_results: Vec<ToolResult>,
    /// Model rounds used.
    pub rounds: usize,
    /// Whether the round ceiling cut the turn short.
    pub ceiling_hit: bool,
    /// The input conversation extended with this turn's messages.
    pub messages: Vec<Message>,
}

/// Streaming handle for a single run invocation.
pub struct RunStream {
    /// Turn id associated with the streaming response.
    pub turn_id: TurnId,
    /// Stream of events emitted during the run.
    pub events: BroadcastStream<EventMsg>,
    handle: JoinHandle<Result<RunResult, OrchestratorError>>,
}

impl RunStream {
    /// Await completion of the run and return the final result.
    pub async fn finish(self) -> Result<RunResult, OrchestratorError> {
        self.handle
            .await
            .map_err(|err| OrchestratorError::Executor(err.to_string()))?
    }
}

#[derive(Clone)]
struct RunEventBus {
    sender: broadcast::Sender<EventMsg>,
}

impl RunEventBus {
    fn new(buffer: usize) -> (Self, broadcast::Receiver<EventMsg>) {
        let (sender, receiver) = broadcast::channel(buffer);
        (Self { sender }, receiver)
    }
}

impl EventSink for RunEventBus {
    fn emit(&self, event: EventMsg) {
        let _ = self.sender.send(event);
    }
}

struct FanoutEventSink {
    primary: Option<Arc<dyn EventSink>>,
    secondary: Arc<dyn EventSink>,
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: EventMsg) {
        if let Some(primary) = &self.primary {
            primary.emit(event.clone());
        }
        self.secondary.emit(event);
    }
}

/// Runs conversation turns: model calls interleaved with tool dispatch.
pub struct Orchestrator {
    executor: Arc<TurnExecutor>,
    event_sink: Option<Arc<dyn EventSink>>,
}

impl Orchestrator {
    /// Build an orchestrator over a model and a dispatcher.
    ///
    /// `context_provider` only decorates the system prompt.
    pub fn new(
        llm: Arc<dyn LLMProvider>,
        dispatcher: ToolDispatcher,
        context_provider: Option<Arc<dyn ContextProvider>>,
        config: OrchestratorConfig,
    ) -> Self {
        info!(
            "initializing orchestrator (max_rounds={}, tools={}, context={})",
            config.max_rounds,
            dispatcher.catalog().len(),
            context_provider.is_some()
        );
        let prompt_builder = PromptBuilder::new(
            config.system_prompt.clone(),
            context_provider,
            config.context_limit,
        );
        Self {
            executor: Arc::new(TurnExecutor::new(
                llm,
                dispatcher,
                prompt_builder,
                config.max_rounds,
            )),
            event_sink: None,
        }
    }

    /// Also deliver events of `run_stream` turns to `sink`.
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    /// Run one turn and wait for the final answer.
    ///
    /// Only a model failure is an error; tool failures are in `tool_results`.
    pub async fn run(&self, conversation: Vec<Message>) -> Result<RunResult, OrchestratorError> {
        self.executor
            .run_turn(TurnParams {
                turn_id: Uuid::new_v4(),
                conversation,
                event_sink: None,
            })
            .await
    }

    /// Run one turn with a streamed model, emitting every event into `sink`.
    pub async fn run_with_sink(
        &self,
        conversation: Vec<Message>,
        sink: Arc<dyn EventSink>,
    ) -> Result<RunResult, OrchestratorError> {
        self.executor
            .run_turn(TurnParams {
                turn_id: Uuid::new_v4(),
                conversation,
                event_sink: Some(sink),
            })
            .await
    }

    /// Run one turn in the background and stream its events.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run_stream(&self, conversation: Vec<Message>) -> RunStream {
        let turn_id = Uuid::new_v4();
        debug!(
            "streaming turn (turn_id={}, messages={})",
            turn_id,
            conversation.len()
        );
        let (run_bus, receiver) = RunEventBus::new(RUN_STREAM_BUFFER);
        let fanout: Arc<dyn EventSink> = Arc::new(FanoutEventSink {
            primary: self.event_sink.clone(),
            secondary: Arc::new(run_bus),
        });
        let executor = self.executor.clone();
        let handle = tokio::spawn(async move {
            executor
                .run_turn(TurnParams {
                    turn_id,
                    conversation,
                    event_sink: Some(fanout),
                })
                .await
        });

        RunStream {
            turn_id,
            events: BroadcastStream::new(receiver),
            handle,
        }
    }
}
