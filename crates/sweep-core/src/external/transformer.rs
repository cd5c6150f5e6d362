//! Transformation command

use crate::error::SweepResult;
use crate::executor::{TransformOutcome, Transformer};
use crate::external::command::CommandLine;
use crate::violation::{Project, Violation};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Transformer that runs a command once per violation.
///
/// `{file}` and `{kind}` in the command are replaced with the violation's
/// project-relative path and kind. The same values plus the evidence are
/// exported as `SWEEP_FILE`, `SWEEP_KIND`, `SWEEP_SEVERITY` and
/// `SWEEP_EVIDENCE`. Exit status 0 means the violation was resolved.
pub struct CommandTransformer {
    command: CommandLine,
    timeout: Option<Duration>,
}

impl CommandTransformer {
    pub fn new(command: &str) -> SweepResult<Self> {
        Ok(Self {
            command: CommandLine::parse(command)?,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn environment(violation: &Violation) -> BTreeMap<String, String> {
        let mut env = BTreeMap::new();
        env.insert(
            "SWEEP_FILE".to_string(),
            violation.file.display().to_string(),
        );
        env.insert("SWEEP_KIND".to_string(), violation.kind.as_str().to_string());
        env.insert("SWEEP_SEVERITY".to_string(), violation.severity.to_string());
        if let Some(evidence) = &violation.evidence {
            env.insert("SWEEP_EVIDENCE".to_string(), evidence.clone());
        }
        env
    }
}

#[async_trait]
impl Transformer for CommandTransformer {
    fn name(&self) -> &str {
        "transform-command"
    }

    async fn transform(
        &self,
        project: &Project,
        violation: &Violation,
    ) -> SweepResult<TransformOutcome> {
        let file = violation.file.display().to_string();
        let command = self
            .command
            .substitute(&[("file", &file), ("kind", violation.kind.as_str())]);
        let output = command
            .run(project.root(), &Self::environment(violation), self.timeout)
            .await?;

        if output.success() {
            Ok(TransformOutcome::Resolved)
        } else {
            Ok(TransformOutcome::unresolved(output.diagnostics()))
        }
    }
}
