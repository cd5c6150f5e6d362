//! Unattended driver: full batches until complete or aborted

use crate::error::SweepError;
use crate::executor::BatchReport;
use crate::orchestrator::engine::Engine;
use crate::orchestrator::machine::{RunContext, RunSummary, StartMode};
use crate::orchestrator::state::{AbortReason, OrchestratorState, RunOutcome};
use crate::orchestrator::status::OrchestratorHandle;
use crate::planner::{CompletionReason, WorkItem};
use crate::validation::ValidationReport;
use std::path::PathBuf;

/// Why the batch in hand is being reverted
#[derive(Debug, Clone)]
enum RevertCause {
    /// Some items did not resolve their violations
    LocalFailure,
    /// A project-wide gate failed
    Regression { summary: String },
}

enum Next {
    To(OrchestratorState),
    Complete(CompletionReason),
    Abort(AbortReason),
}

impl Next {
    fn fatal(message: impl Into<String>) -> Self {
        Self::Abort(AbortReason::fatal(message))
    }

    /// Abort on an infrastructure error
    fn error(e: &SweepError) -> Self {
        tracing::error!(code = e.error_code(), fatal = e.is_fatal(), error = %e, "Run aborted");
        Self::fatal(e.to_string())
    }
}

/// Batch-mode state machine over an [`Engine`]
pub struct Orchestrator {
    engine: Engine,
    state: OrchestratorState,
    ctx: Option<RunContext>,
    report: Option<BatchReport>,
    validation: Option<ValidationReport>,
    revert_cause: Option<RevertCause>,
    outcome: Option<RunOutcome>,
}

impl Orchestrator {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            state: OrchestratorState::Analyzing,
            ctx: None,
            report: None,
            validation: None,
            revert_cause: None,
            outcome: None,
        }
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn handle(&self) -> OrchestratorHandle {
        self.engine.handle()
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn context(&self) -> Option<&RunContext> {
        self.ctx.as_ref()
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    /// Load or create the starting checkpoint; a store failure aborts
    pub async fn start(&mut self, mode: StartMode) {
        self.state = OrchestratorState::Analyzing;
        self.outcome = None;
        match self.engine.begin(mode).await {
            Ok(ctx) => {
                self.ctx = Some(ctx);
                self.engine
                    .publish(self.state, self.ctx.as_ref(), None);
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not load checkpoint state");
                self.apply(Next::error(&e));
            }
        }
    }

    /// Drive the state machine until it reaches a terminal state
    pub async fn run(&mut self, mode: StartMode) -> RunSummary {
        self.start(mode).await;
        while !self.state.is_terminal() {
            self.step().await;
        }
        self.summary()
    }

    pub fn summary(&self) -> RunSummary {
        let outcome = self.outcome.clone().unwrap_or(RunOutcome::Aborted {
            abort: AbortReason::fatal("run has not finished"),
        });
        RunSummary::new(outcome, self.ctx.as_ref(), &self.engine)
    }

    /// Run the current state and transition once
    pub async fn step(&mut self) -> OrchestratorState {
        if self.state.is_terminal() {
            return self.state;
        }
        let next = match self.state {
            OrchestratorState::Analyzing => self.on_analyzing().await,
            OrchestratorState::Planning => self.on_planning(),
            OrchestratorState::Executing => self.on_executing().await,
            OrchestratorState::Validating => self.on_validating().await,
            OrchestratorState::Checkpointing => self.on_checkpointing().await,
            OrchestratorState::Reverting => self.on_reverting().await,
            OrchestratorState::Complete | OrchestratorState::Aborted => return self.state,
        };
        self.apply(next);
        self.state
    }

    fn apply(&mut self, next: Next) {
        let (target, outcome) = match next {
            Next::To(state) => (state, None),
            Next::Complete(completion) => (
                OrchestratorState::Complete,
                Some(RunOutcome::Complete { completion }),
            ),
            Next::Abort(abort) => (
                OrchestratorState::Aborted,
                Some(RunOutcome::Aborted { abort }),
            ),
        };

        if !self.state.can_transition_to(&target) {
            tracing::error!(from = %self.state, to = %target, "Unexpected state transition");
        }
        tracing::debug!(from = %self.state, to = %target, "State transition");
        self.state = target;

        if let Some(outcome) = outcome {
            match &outcome {
                RunOutcome::Complete { completion } => {
                    tracing::info!(reason = %completion, "Run complete");
                }
                RunOutcome::Aborted { abort } => {
                    tracing::warn!(reason = %abort, "Run aborted");
                }
            }
            self.outcome = Some(outcome);
        }
        self.engine
            .publish(self.state, self.ctx.as_ref(), self.outcome.as_ref());
    }

    async fn on_analyzing(&mut self) -> Next {
        let Some(ctx) = self.ctx.as_mut() else {
            return Next::fatal("orchestrator was not started");
        };
        if self.engine.cycle_budget_spent(ctx) {
            return Next::Abort(AbortReason::CycleBudget);
        }
        self.engine.analyze(ctx).await;
        Next::To(OrchestratorState::Planning)
    }

    fn on_planning(&mut self) -> Next {
        let Some(ctx) = self.ctx.as_mut() else {
            return Next::fatal("orchestrator was not started");
        };
        if let Some(completion) = self.engine.plan(ctx) {
            return Next::Complete(completion);
        }
        match self.engine.boundary_check(ctx) {
            Some(abort) => Next::Abort(abort),
            None => Next::To(OrchestratorState::Executing),
        }
    }

    async fn on_executing(&mut self) -> Next {
        let Some(ctx) = self.ctx.as_mut() else {
            return Next::fatal("orchestrator was not started");
        };
        let batch = self.engine.next_batch(ctx);
        match self.engine.executor.execute(&self.engine.project, &batch).await {
            Ok(report) => {
                tracing::info!(
                    batch = %report.batch,
                    succeeded = report.succeeded().count(),
                    failed = report.failed().count(),
                    "Batch executed"
                );
                self.report = Some(report);
                Next::To(OrchestratorState::Validating)
            }
            Err(e) => Next::error(&e),
        }
    }

    async fn on_validating(&mut self) -> Next {
        let (Some(ctx), Some(report)) = (self.ctx.as_ref(), self.report.as_ref()) else {
            return Next::fatal("no executed batch to validate");
        };

        // Gates only run once every file resolved locally
        if !report.all_succeeded() {
            self.revert_cause = Some(RevertCause::LocalFailure);
            return Next::To(OrchestratorState::Reverting);
        }

        let files: Vec<PathBuf> = report.files().into_iter().map(PathBuf::from).collect();
        let validation = self.engine.validate(ctx, &files).await;
        if validation.passed() {
            self.validation = Some(validation);
            Next::To(OrchestratorState::Checkpointing)
        } else {
            let summary = validation.summary();
            tracing::warn!(batch = %report.batch, reason = %summary, "Batch failed validation");
            self.revert_cause = Some(RevertCause::Regression { summary });
            Next::To(OrchestratorState::Reverting)
        }
    }

    async fn on_checkpointing(&mut self) -> Next {
        let (Some(ctx), Some(report)) = (self.ctx.as_mut(), self.report.take()) else {
            return Next::fatal("no validated batch to checkpoint");
        };
        let coverage = self.validation.take().and_then(|v| v.coverage);
        let items: Vec<WorkItem> = report.items.iter().map(|r| r.item.clone()).collect();

        if let Err(e) = self.engine.commit(ctx, &items, coverage).await {
            if let Err(revert) = report.revert_all().await {
                tracing::error!(error = %revert, "failed to restore batch after checkpoint error");
            }
            return Next::error(&e);
        }
        // Releases the file locks
        drop(report);

        match self.engine.boundary_check(ctx) {
            Some(abort) => Next::Abort(abort),
            None => Next::To(OrchestratorState::Analyzing),
        }
    }

    async fn on_reverting(&mut self) -> Next {
        let (Some(ctx), Some(report)) = (self.ctx.as_mut(), self.report.take()) else {
            return Next::fatal("no batch to revert");
        };
        self.validation = None;

        if let Err(e) = report.revert_all().await {
            return Next::error(&e);
        }

        match self.revert_cause.take() {
            Some(RevertCause::Regression { summary }) => {
                for item in &report.items {
                    self.engine.record_failure(ctx, &item.item.file, &summary);
                }
            }
            Some(RevertCause::LocalFailure) | None => {
                for item in &report.items {
                    match item.failure_reason() {
                        Some(reason) => self.engine.record_failure(ctx, &item.item.file, reason),
                        None => tracing::debug!(
                            file = %item.item.file.display(),
                            "Returned to queue after sibling failure"
                        ),
                    }
                }
            }
        }
        drop(report);

        match self.engine.boundary_check(ctx) {
            Some(abort) => Next::Abort(abort),
            None => Next::To(OrchestratorState::Planning),
        }
    }
}
