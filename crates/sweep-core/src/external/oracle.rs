//! Build, test and coverage commands

use crate::error::{SweepError, SweepResult};
use crate::external::command::CommandLine;
use crate::validation::{GateReport, QualityOracle};
use crate::violation::Project;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Diagnostics kept from a failing build or test command
const MAX_DIAGNOSTIC_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CoverageOutput {
    Percent(f64),
    Object { percent: f64 },
}

/// Quality oracle that judges gates by command exit status
#[derive(Debug, Clone, Default)]
pub struct CommandOracle {
    build: Option<CommandLine>,
    test: Option<CommandLine>,
    coverage: Option<CommandLine>,
    timeout: Option<Duration>,
}

impl CommandOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_build(mut self, command: &str) -> SweepResult<Self> {
        self.build = Some(CommandLine::parse(command)?);
        Ok(self)
    }

    pub fn with_test(mut self, command: &str) -> SweepResult<Self> {
        self.test = Some(CommandLine::parse(command)?);
        Ok(self)
    }

    pub fn with_coverage(mut self, command: &str) -> SweepResult<Self> {
        self.coverage = Some(CommandLine::parse(command)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    async fn gate(
        &self,
        gate: &str,
        command: Option<&CommandLine>,
        project: &Project,
    ) -> SweepResult<GateReport> {
        let command = command
            .ok_or_else(|| SweepError::validation(gate, "no command configured"))?;
        let output = command
            .run(project.root(), &BTreeMap::new(), self.timeout)
            .await
            .map_err(|e| SweepError::validation(gate, e.to_string()))?;

        if output.success() {
            Ok(GateReport::pass())
        } else {
            Ok(GateReport::fail(truncate(output.diagnostics())))
        }
    }
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_DIAGNOSTIC_CHARS {
        let mut end = MAX_DIAGNOSTIC_CHARS;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
        text.push_str("\n... (truncated)");
    }
    text
}

fn parse_coverage(stdout: &str) -> SweepResult<f64> {
    let percent = match serde_json::from_str::<CoverageOutput>(stdout.trim())? {
        CoverageOutput::Percent(percent) | CoverageOutput::Object { percent } => percent,
    };
    if !(0.0..=100.0).contains(&percent) {
        return Err(SweepError::validation(
            "coverage",
            format!("{} is not a percentage", percent),
        ));
    }
    Ok(percent)
}

#[async_trait]
impl QualityOracle for CommandOracle {
    async fn build(&self, project: &Project) -> SweepResult<GateReport> {
        self.gate("build", self.build.as_ref(), project).await
    }

    async fn test(&self, project: &Project) -> SweepResult<GateReport> {
        self.gate("test", self.test.as_ref(), project).await
    }

    async fn coverage(&self, project: &Project) -> SweepResult<f64> {
        let command = self
            .coverage
            .as_ref()
            .ok_or_else(|| SweepError::validation("coverage", "no command configured"))?;
        let output = command
            .run(project.root(), &BTreeMap::new(), self.timeout)
            .await?;
        if !output.success() {
            return Err(SweepError::validation("coverage", output.diagnostics()));
        }
        parse_coverage(&output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coverage_forms() {
        assert_eq!(parse_coverage("87.5\n").unwrap(), 87.5);
        assert_eq!(parse_coverage(r#"{"percent": 62}"#).unwrap(), 62.0);
        assert!(parse_coverage("120").is_err());
        assert!(parse_coverage("n/a").is_err());
    }

    #[test]
    fn test_truncate_long_diagnostics() {
        let text = truncate("é".repeat(MAX_DIAGNOSTIC_CHARS));
        assert!(text.ends_with("(truncated)"));
        assert!(text.len() < MAX_DIAGNOSTIC_CHARS + 20);
    }

    #[tokio::test]
    async fn test_unconfigured_gate_errors() {
        let dir = tempfile::TempDir::new().unwrap();
        let oracle = CommandOracle::new();
        let project = Project::new(dir.path());
        assert!(oracle.build(&project).await.is_err());
        assert!(oracle.coverage(&project).await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_gates_follow_exit_status() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = Project::new(dir.path());
        let oracle = CommandOracle::new()
            .with_build("true")
            .unwrap()
            .with_test("sh -c 'echo 2 failed >&2; exit 1'")
            .unwrap()
            .with_coverage("echo '{\"percent\": 91.0}'")
            .unwrap();

        assert!(oracle.build(&project).await.unwrap().passed);
        let test = oracle.test(&project).await.unwrap();
        assert!(!test.passed);
        assert_eq!(test.diagnostics.as_deref(), Some("2 failed"));
        assert_eq!(oracle.coverage(&project).await.unwrap(), 91.0);
    }
}
