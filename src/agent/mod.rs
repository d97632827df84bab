//! The agent core: a perception-decide-act loop that drives a browser
//! until the decision engine ends the run (or a safety bound trips).

pub mod actions;
pub mod decision;
pub mod retriever;
pub mod state;

use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::browser::ChromeSession;
use crate::config::Config;
use crate::llm::LanguageModel;
use actions::ActionRegistry;
use decision::DecisionEngine;
use retriever::PageContextRetriever;
use state::{AgentState, EntryKind, StateUpdate, TranscriptEntry};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The decision engine issued the terminal command.
    Completed,
    /// A malformed command (unknown action or missing data field) stopped
    /// the run; this signals a decision engine defect.
    Aborted,
    /// The safety bound on cycles was reached before termination.
    MaxCyclesReached,
}

/// Final result of one agent run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Number of actions executed.
    pub cycles: u32,
    pub transcript: Vec<TranscriptEntry>,
}

impl RunOutcome {
    /// A run passes when it completed normally and no step reported an
    /// error along the way.
    pub fn passed(&self) -> bool {
        self.status == RunStatus::Completed
            && self
                .transcript
                .iter()
                .all(|entry| entry.kind != EntryKind::Error)
    }

    /// First error line, if any step reported one.
    pub fn first_error(&self) -> Option<&str> {
        self.transcript
            .iter()
            .find(|entry| entry.kind == EntryKind::Error)
            .map(|entry| entry.content.as_str())
    }
}

/// The decide/act cycle over one [`AgentState`].
///
/// Each cycle starts in the Deciding phase: the retriever computes the
/// page context (two concurrent sub-operations, jointly awaited), the
/// decision engine picks a command, and its rationale joins the
/// transcript. A terminal command moves straight to Terminated; otherwise
/// the Acting phase runs the chosen action and control returns to
/// Deciding. The only shared mutable resource is the state itself.
pub struct AgentLoop {
    registry: ActionRegistry,
    retriever: PageContextRetriever,
    engine: DecisionEngine,
    max_cycles: u32,
}

impl AgentLoop {
    pub fn new(llm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        let registry = ActionRegistry::with_builtin_actions();
        let retriever = PageContextRetriever::new(llm.clone(), config);
        let engine = DecisionEngine::new(llm, &registry);
        Self {
            registry,
            retriever,
            engine,
            max_cycles: config.max_cycles,
        }
    }

    /// Drive the state until termination. Fatal validation errors abort
    /// the run with a distinguishable transcript entry; everything else
    /// ends through a terminal command or the cycle bound.
    pub async fn run(&self, state: &mut AgentState) -> RunOutcome {
        let mut cycles: u32 = 0;

        let status = loop {
            if cycles >= self.max_cycles {
                state.apply(StateUpdate::error(format!(
                    "Reached maximum cycle limit ({})",
                    self.max_cycles
                )));
                break RunStatus::MaxCyclesReached;
            }

            // Deciding phase.
            let context = self.retriever.retrieve(state).await;
            state.apply(context);

            let command = self.engine.decide(state).await;
            info!("decision: {}: {}", command.action, command.description);
            let terminal = command.is_terminal();
            state.apply(command.into_update());

            if terminal {
                break RunStatus::Completed;
            }

            // Acting phase.
            let action = match self.registry.lookup(&state.action) {
                Ok(action) => action,
                Err(e) => {
                    state.apply(StateUpdate::error(format!("Run aborted: {e}")));
                    break RunStatus::Aborted;
                }
            };

            cycles += 1;
            match action.run(state).await {
                Ok(update) => state.apply(update),
                Err(e) => {
                    state.apply(StateUpdate::error(format!("Run aborted: {e}")));
                    break RunStatus::Aborted;
                }
            }
        };

        RunOutcome {
            status,
            cycles,
            transcript: state.messages.clone(),
        }
    }
}

/// One-shot runner tying the loop to a real browser session.
///
/// Every run launches its own Chrome, hands the page to a fresh
/// [`AgentState`], and closes the browser on every exit path.
pub struct E2eTestAgent {
    agent_loop: AgentLoop,
    headless: bool,
}

impl E2eTestAgent {
    pub fn new(llm: Arc<dyn LanguageModel>, config: &Config) -> Self {
        Self {
            agent_loop: AgentLoop::new(llm, config),
            headless: config.headless,
        }
    }

    /// Run the agent against a natural-language requirement.
    pub async fn run(&self, requirement: &str) -> Result<RunOutcome> {
        info!("starting run: {requirement}");
        let session = ChromeSession::launch(self.headless).await?;

        let page = match session.new_page() {
            Ok(page) => page,
            Err(e) => {
                session.close().await;
                return Err(e);
            }
        };

        let mut state = AgentState::new(requirement, Arc::new(page));
        let outcome = self.agent_loop.run(&mut state).await;
        session.close().await;

        info!(
            "run finished: {:?} after {} action(s)",
            outcome.status, outcome.cycles
        );
        Ok(outcome)
    }
}
