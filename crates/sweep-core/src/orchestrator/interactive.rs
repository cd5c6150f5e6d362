//! Stepwise driver: one proposed fix at a time, decided by an operator

use crate::error::{SweepError, SweepResult};
use crate::executor::{ItemReport, PreImage};
use crate::orchestrator::engine::Engine;
use crate::orchestrator::machine::{RunContext, RunSummary, StartMode};
use crate::orchestrator::state::{AbortReason, OrchestratorState, RunOutcome};
use crate::orchestrator::status::OrchestratorHandle;
use crate::planner::WorkItem;
use crate::validation::ValidationReport;
use std::path::{Path, PathBuf};

/// What an operator decision led to
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Validated and checkpointed
    Committed { sequence: u64 },
    /// Accepted, but a gate failed; the file was restored and skipped
    ValidationFailed { report: ValidationReport },
    Rejected,
    Skipped,
}

/// Interactive counterpart of the batch [`Orchestrator`](super::Orchestrator)
///
/// Planning is shared with batch mode. Executing, Validating and
/// Checkpointing are replaced by [`Session`]s.
pub struct InteractiveDriver {
    engine: Engine,
    ctx: RunContext,
    state: OrchestratorState,
    outcome: Option<RunOutcome>,
}

impl InteractiveDriver {
    /// Load the starting checkpoint and run the first analysis
    pub async fn start(engine: Engine, mode: StartMode) -> SweepResult<Self> {
        let mut ctx = engine.begin(mode).await?;
        engine.analyze(&mut ctx).await;
        let driver = Self {
            engine,
            ctx,
            state: OrchestratorState::Planning,
            outcome: None,
        };
        driver.publish();
        Ok(driver)
    }

    pub fn state(&self) -> OrchestratorState {
        self.state
    }

    pub fn outcome(&self) -> Option<&RunOutcome> {
        self.outcome.as_ref()
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn handle(&self) -> OrchestratorHandle {
        self.engine.handle()
    }

    pub fn summary(&self) -> RunSummary {
        let outcome = self.outcome.clone().unwrap_or(RunOutcome::Aborted {
            abort: AbortReason::Interrupted,
        });
        RunSummary::new(outcome, Some(&self.ctx), &self.engine)
    }

    fn publish(&self) {
        self.engine
            .publish(self.state, Some(&self.ctx), self.outcome.as_ref());
    }

    fn finish(&mut self, outcome: RunOutcome) {
        tracing::info!(outcome = %outcome, "Interactive run finished");
        self.state = outcome.state();
        self.outcome = Some(outcome);
        self.publish();
    }

    fn fail(&mut self, error: &SweepError) {
        tracing::error!(code = error.error_code(), error = %error, "Run aborted");
        self.finish(RunOutcome::Aborted {
            abort: AbortReason::fatal(error.to_string()),
        });
    }

    /// Stop the run; the next [`open_session`](Self::open_session) returns `None`
    pub fn stop(&mut self) {
        if !self.state.is_terminal() {
            self.finish(RunOutcome::Aborted {
                abort: AbortReason::Interrupted,
            });
        }
    }

    /// Propose a fix for the next planned file.
    ///
    /// Proposals that do not resolve their violations are restored and
    /// skipped automatically. Returns `None` once the run is complete or
    /// aborted.
    pub async fn open_session(&mut self) -> SweepResult<Option<Session<'_>>> {
        loop {
            if self.state.is_terminal() {
                return Ok(None);
            }

            if let Some(completion) = self.engine.plan(&mut self.ctx) {
                self.finish(RunOutcome::Complete { completion });
                return Ok(None);
            }
            if let Some(abort) = self.engine.boundary_check(&self.ctx) {
                self.finish(RunOutcome::Aborted { abort });
                return Ok(None);
            }

            let Some(item) = self.ctx.plan.take_batch(1).into_iter().next() else {
                continue;
            };
            let report = match self
                .engine
                .executor
                .execute_item(&self.engine.project, item)
                .await
            {
                Ok(report) => report,
                Err(e) => {
                    self.fail(&e);
                    return Err(e);
                }
            };

            if let Some(reason) = report.failure_reason() {
                let reason = reason.to_string();
                self.engine
                    .record_failure(&mut self.ctx, &report.item.file, &reason);
                self.publish();
                continue;
            }

            tracing::info!(file = %report.item.file.display(), "Proposed fix ready for review");
            return Ok(Some(Session {
                driver: self,
                report,
            }));
        }
    }
}

/// One proposed fix holding its file lock until decided
pub struct Session<'a> {
    driver: &'a mut InteractiveDriver,
    report: ItemReport,
}

impl Session<'_> {
    pub fn item(&self) -> &WorkItem {
        &self.report.item
    }

    pub fn file(&self) -> &Path {
        &self.report.item.file
    }

    pub fn pre_image(&self) -> &PreImage {
        self.report.pre_image()
    }

    /// The file as the transformation left it
    pub async fn proposed_content(&self) -> SweepResult<Option<Vec<u8>>> {
        let path = self.pre_image().path();
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SweepError::io_at(
                format!("Failed to read proposal: {}", e),
                path,
            )),
        }
    }

    /// Validate the proposal and commit it if every gate passes
    pub async fn accept(self) -> SweepResult<SessionOutcome> {
        let Session { driver, report } = self;
        let engine = &driver.engine;

        driver.state = OrchestratorState::Validating;
        driver.publish();
        let files = vec![PathBuf::from(&report.item.file)];
        let validation = engine.validate(&driver.ctx, &files).await;

        if !validation.passed() {
            driver.state = OrchestratorState::Reverting;
            driver.publish();
            if let Err(e) = report.revert().await {
                driver.fail(&e);
                return Err(e);
            }
            let summary = validation.summary();
            engine.record_failure(&mut driver.ctx, &report.item.file, &summary);
            driver.state = OrchestratorState::Planning;
            driver.publish();
            return Ok(SessionOutcome::ValidationFailed { report: validation });
        }

        driver.state = OrchestratorState::Checkpointing;
        driver.publish();
        let items = [report.item.clone()];
        let sequence = match engine.commit(&mut driver.ctx, &items, validation.coverage).await {
            Ok(sequence) => sequence,
            Err(e) => {
                if let Err(revert) = report.revert().await {
                    tracing::error!(error = %revert, "failed to restore file after checkpoint error");
                }
                driver.fail(&e);
                return Err(e);
            }
        };
        drop(report);

        driver.state = OrchestratorState::Analyzing;
        driver.publish();
        driver.engine.analyze(&mut driver.ctx).await;
        driver.state = OrchestratorState::Planning;
        driver.publish();
        Ok(SessionOutcome::Committed { sequence })
    }

    /// Discard the proposal; counts as a failed attempt
    pub async fn reject(self) -> SweepResult<SessionOutcome> {
        let Session { driver, report } = self;
        if let Err(e) = report.revert().await {
            driver.fail(&e);
            return Err(e);
        }
        driver
            .engine
            .record_failure(&mut driver.ctx, &report.item.file, "rejected by operator");
        driver.publish();
        Ok(SessionOutcome::Rejected)
    }

    /// Discard the proposal without counting an attempt
    pub async fn skip(self) -> SweepResult<SessionOutcome> {
        let Session { driver, report } = self;
        if let Err(e) = report.revert().await {
            driver.fail(&e);
            return Err(e);
        }
        driver
            .engine
            .record_skip(&mut driver.ctx, &report.item.file, "skipped by operator");
        driver.publish();
        Ok(SessionOutcome::Skipped)
    }
}
