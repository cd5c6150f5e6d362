//! Builder wiring for the `[commands]` configuration section

use crate::error::SweepResult;
use crate::external::oracle::CommandOracle;
use crate::external::sources::{CommandSignalSource, CommandViolationSource};
use crate::external::transformer::CommandTransformer;
use crate::orchestrator::EngineBuilder;
use crate::violation::ViolationKind;
use std::sync::Arc;

impl EngineBuilder {
    /// Register a command-backed collaborator for every configured command.
    ///
    /// Call after [`with_config`](Self::with_config). Gates without a
    /// command are disabled.
    pub fn with_configured_commands(mut self) -> SweepResult<Self> {
        let commands = self.config.commands.clone();
        let timeout = commands.timeout;

        let analyzers = [
            (ViolationKind::Lint, &commands.lint),
            (ViolationKind::BuildError, &commands.build_errors),
            (ViolationKind::LowCoverage, &commands.coverage),
            (ViolationKind::HighComplexity, &commands.complexity),
            (ViolationKind::Satd, &commands.satd),
        ];
        for (kind, command) in analyzers {
            if let Some(command) = command {
                let source = CommandViolationSource::new(kind, command)?.with_timeout(timeout);
                self = self.with_source(Arc::new(source));
            }
        }

        if let Some(command) = &commands.signals {
            let signals = CommandSignalSource::new(command)?.with_timeout(timeout);
            self = self.with_signals(Arc::new(signals));
        }

        let mut oracle = CommandOracle::new().with_timeout(timeout);
        let gates = &mut self.config.gates;
        match &commands.build {
            Some(command) => oracle = oracle.with_build(command)?,
            None if gates.build => {
                tracing::warn!("No build command configured, build gate disabled");
                gates.build = false;
            }
            None => {}
        }
        match &commands.test {
            Some(command) => oracle = oracle.with_test(command)?,
            None if gates.test => {
                tracing::warn!("No test command configured, test gate disabled");
                gates.test = false;
            }
            None => {}
        }
        match &commands.coverage_total {
            Some(command) => oracle = oracle.with_coverage(command)?,
            None if gates.coverage => {
                tracing::warn!("No coverage_total command configured, coverage gate disabled");
                gates.coverage = false;
            }
            None => {}
        }
        self = self.with_oracle(Arc::new(oracle));

        if let Some(command) = &commands.transform {
            let transformer = CommandTransformer::new(command)?.with_timeout(timeout);
            self = self.with_transformer(Arc::new(transformer));
        }

        Ok(self)
    }
}
