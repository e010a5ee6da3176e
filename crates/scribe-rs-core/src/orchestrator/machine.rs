//! Explicit turn state machine shared by the blocking and streaming drivers.
//!
//! The machine owns no I/O. Drivers call the model or the dispatcher, feed the
//! outcome back through [`TurnMachine::advance`], and act on the returned
//! events. Both run modes go through the same transitions.

use crate::error::OrchestratorError;
use log::{debug, warn};
use scribe_rs_protocol::{ToolInvocation, ToolResult};
use scribe_rs_tools::ToolOutcome;
use std::collections::VecDeque;

/// Where a turn currently is.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnState {
    /// Waiting for the first model call.
    Drafting,
    /// A model call for `round` is in flight.
    AwaitingModel { round: usize },
    /// Running the round's invocations; the front of `pending` is executing.
    ExecutingTools {
        round: usize,
        pending: VecDeque<ToolInvocation>,
        results: Vec<ToolResult>,
    },
    /// Terminal.
    Responding { text: String, ceiling_hit: bool },
}

impl TurnState {
    fn label(&self) -> &'static str {
        match self {
            Self::Drafting => "drafting",
            Self::AwaitingModel { .. } => "awaiting_model",
            Self::ExecutingTools { .. } => "executing_tools",
            Self::Responding { .. } => "responding",
        }
    }
}

/// Inputs a driver feeds into the machine.
#[derive(Debug, Clone)]
pub enum TurnInput {
    /// Start the turn.
    Begin,
    /// The model answered the current round.
    ModelReplied {
        text: String,
        invocations: Vec<ToolInvocation>,
    },
    /// The executing invocation finished.
    ToolFinished(ToolOutcome),
}

impl TurnInput {
    fn label(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::ModelReplied { .. } => "model_replied",
            Self::ToolFinished(_) => "tool_finished",
        }
    }
}

/// Instructions for the driver, in the order they must be carried out.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    /// Call the model for `round`.
    RoundStarted { round: usize },
    /// Dispatch this invocation.
    ToolStart(ToolInvocation),
    /// An invocation produced its result.
    ToolDone {
        invocation: ToolInvocation,
        result: ToolResult,
    },
    /// The turn is over.
    Finished { text: String, ceiling_hit: bool },
}

/// One conversation turn.
#[derive(Debug, Clone)]
pub struct TurnMachine {
    max_rounds: usize,
    state: TurnState,
    rounds: usize,
    partial: Vec<String>,
    tool_results: Vec<ToolResult>,
}

impl TurnMachine {
    /// A fresh machine; `max_rounds` below 1 is treated as 1.
    pub fn new(max_rounds: usize) -> Self {
        Self {
            max_rounds: max_rounds.max(1),
            state: TurnState::Drafting,
            rounds: 0,
            partial: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn state(&self) -> &TurnState {
        &self.state
    }

    /// Number of model rounds entered so far.
    pub fn rounds(&self) -> usize {
        self.rounds
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Every tool result of the turn, in dispatch order.
    pub fn tool_results(&self) -> &[ToolResult] {
        &self.tool_results
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.state, TurnState::Responding { .. })
    }

    /// Apply one input and return the events it produced.
    pub fn advance(&mut self, input: TurnInput) -> Result<Vec<TurnEvent>, OrchestratorError> {
        let state = std::mem::replace(&mut self.state, TurnState::Drafting);
        let state_label = state.label();
        let input_label = input.label();
        let (next, events) = match (state, input) {
            (TurnState::Drafting, TurnInput::Begin) => self.enter_round(1),
            (TurnState::AwaitingModel { round }, TurnInput::ModelReplied { text, invocations }) => {
                self.model_replied(round, text, invocations)
            }
            (
                TurnState::ExecutingTools {
                    round,
                    pending,
                    results,
                },
                TurnInput::ToolFinished(outcome),
            ) => self.tool_finished(round, pending, results, outcome),
            (state, _) => {
                self.state = state;
                return Err(OrchestratorError::InvalidTransition(format!(
                    "{input_label} is not accepted while {state_label}"
                )));
            }
        };
        self.state = next;
        Ok(events)
    }

    fn enter_round(&mut self, round: usize) -> (TurnState, Vec<TurnEvent>) {
        self.rounds = round;
        debug!("starting round (round={}, max_rounds={})", round, self.max_rounds);
        (
            TurnState::AwaitingModel { round },
            vec![TurnEvent::RoundStarted { round }],
        )
    }

    fn model_replied(
        &mut self,
        round: usize,
        text: String,
        invocations: Vec<ToolInvocation>,
    ) -> (TurnState, Vec<TurnEvent>) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.partial.push(trimmed.to_string());
        }
        let pending = VecDeque::from(invocations);
        let Some(first) = pending.front().cloned() else {
            let text = if trimmed.is_empty() {
                self.partial.join("\n\n")
            } else {
                trimmed.to_string()
            };
            return self.finish(text, false);
        };
        debug!(
            "model requested tools (round={}, count={})",
            round,
            pending.len()
        );
        (
            TurnState::ExecutingTools {
                round,
                pending,
                results: Vec::new(),
            },
            vec![TurnEvent::ToolStart(first)],
        )
    }

    fn tool_finished(
        &mut self,
        round: usize,
        mut pending: VecDeque<ToolInvocation>,
        mut results: Vec<ToolResult>,
        outcome: ToolOutcome,
    ) -> (TurnState, Vec<TurnEvent>) {
        let Some(invocation) = pending.pop_front() else {
            // Unreachable through `advance`: ExecutingTools is never entered empty.
            return self.enter_round(round + 1);
        };
        let result = ToolResult {
            tool_name: invocation.name.clone(),
            tool_input: invocation.input.clone(),
            result_text: outcome.text,
            success: outcome.success,
        };
        results.push(result.clone());
        self.tool_results.push(result.clone());
        let mut events = vec![TurnEvent::ToolDone { invocation, result }];

        if let Some(next) = pending.front().cloned() {
            events.push(TurnEvent::ToolStart(next));
            return (
                TurnState::ExecutingTools {
                    round,
                    pending,
                    results,
                },
                events,
            );
        }

        let (next, more) = if round >= self.max_rounds {
            warn!(
                "round ceiling reached (rounds={}, tool_results={})",
                round,
                self.tool_results.len()
            );
            let mut text = self.partial.join("\n\n");
            if !text.is_empty() {
                text.push_str("\n\n");
            }
            text.push_str(&format!(
                "[Stopped after {round} rounds: the tool-use limit for one request was reached.]"
            ));
            self.finish(text, true)
        } else {
            self.enter_round(round + 1)
        };
        events.extend(more);
        (next, events)
    }

    fn finish(&mut self, text: String, ceiling_hit: bool) -> (TurnState, Vec<TurnEvent>) {
        (
            TurnState::Responding {
                text: text.clone(),
                ceiling_hit,
            },
            vec![TurnEvent::Finished { text, ceiling_hit }],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn invocation(id: &str, name: &str) -> ToolInvocation {
        ToolInvocation {
            id: id.to_string(),
            name: name.to_string(),
            input: json!({}),
        }
    }

    #[test]
    fn final_text_without_tools_finishes_in_one_round() {
        let mut machine = TurnMachine::new(10);
        assert_eq!(
            machine.advance(TurnInput::Begin).expect("begin"),
            vec![TurnEvent::RoundStarted { round: 1 }]
        );
        let events = machine
            .advance(TurnInput::ModelReplied {
                text: "Hello!".to_string(),
                invocations: Vec::new(),
            })
            .expect("reply");
        assert_eq!(
            events,
            vec![TurnEvent::Finished {
                text: "Hello!".to_string(),
                ceiling_hit: false
            }]
        );
        assert!(machine.is_finished());
        assert_eq!(machine.rounds(), 1);
    }

    #[test]
    fn invocations_run_in_emission_order_before_next_round() {
        let mut machine = TurnMachine::new(10);
        machine.advance(TurnInput::Begin).expect("begin");
        let events = machine
            .advance(TurnInput::ModelReplied {
                text: "Checking.".to_string(),
                invocations: vec![invocation("a", "task_list"), invocation("b", "task_toggle")],
            })
            .expect("reply");
        assert_eq!(events, vec![TurnEvent::ToolStart(invocation("a", "task_list"))]);

        let events = machine
            .advance(TurnInput::ToolFinished(ToolOutcome::ok("1 open")))
            .expect("first");
        assert_eq!(events.len(), 2);
        assert_eq!(events[1], TurnEvent::ToolStart(invocation("b", "task_toggle")));

        let events = machine
            .advance(TurnInput::ToolFinished(ToolOutcome::failed("boom")))
            .expect("second");
        assert_eq!(events.last(), Some(&TurnEvent::RoundStarted { round: 2 }));
        let names = machine
            .tool_results()
            .iter()
            .map(|result| (result.tool_name.as_str(), result.success))
            .collect::<Vec<_>>();
        assert_eq!(names, vec![("task_list", true), ("task_toggle", false)]);
    }

    #[test]
    fn ceiling_terminates_with_partial_text() {
        let mut machine = TurnMachine::new(2);
        machine.advance(TurnInput::Begin).expect("begin");
        let mut finished = None;
        for round in 1..=2 {
            machine
                .advance(TurnInput::ModelReplied {
                    text: format!("Step {round}."),
                    invocations: vec![invocation("x", "vault_list")],
                })
                .expect("reply");
            let events = machine
                .advance(TurnInput::ToolFinished(ToolOutcome::ok("listing")))
                .expect("tool");
            finished = events.into_iter().find_map(|event| match event {
                TurnEvent::Finished { text, ceiling_hit } => Some((text, ceiling_hit)),
                _ => None,
            });
        }
        let (text, ceiling_hit) = finished.expect("finished");
        assert!(ceiling_hit);
        assert!(text.starts_with("Step 1.\n\nStep 2.\n\n[Stopped after 2 rounds"));
        assert_eq!(machine.rounds(), 2);
    }

    #[test]
    fn out_of_order_inputs_are_rejected_without_losing_state() {
        let mut machine = TurnMachine::new(3);
        let err = machine
            .advance(TurnInput::ToolFinished(ToolOutcome::ok("x")))
            .expect_err("not started");
        match err {
            OrchestratorError::InvalidTransition(message) => {
                assert_eq!(message, "tool_finished is not accepted while drafting")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(machine.state(), &TurnState::Drafting);

        machine.advance(TurnInput::Begin).expect("begin");
        assert!(machine.advance(TurnInput::Begin).is_err());
        assert_eq!(machine.state(), &TurnState::AwaitingModel { round: 1 });
    }

    #[test]
    fn empty_final_reply_falls_back_to_earlier_text() {
        let mut machine = TurnMachine::new(5);
        machine.advance(TurnInput::Begin).expect("begin");
        machine
            .advance(TurnInput::ModelReplied {
                text: "Adding it now.".to_string(),
                invocations: vec![invocation("a", "task_add")],
            })
            .expect("reply");
        machine
            .advance(TurnInput::ToolFinished(ToolOutcome::ok("Added")))
            .expect("tool");
        let events = machine
            .advance(TurnInput::ModelReplied {
                text: "  ".to_string(),
                invocations: Vec::new(),
            })
            .expect("final");
        assert_eq!(
            events,
            vec![TurnEvent::Finished {
                text: "Adding it now.".to_string(),
                ceiling_hit: false
            }]
        );
    }
}
