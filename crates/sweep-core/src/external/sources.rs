//! Analyzer and signal commands

use crate::error::{SweepError, SweepResult};
use crate::external::command::{CommandLine, CommandOutput};
use crate::violation::{
    FeedEntry, FileSignals, Project, SignalSource, SourceReport, ViolationKind, ViolationSource,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// What an analyzer command may print
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Feed {
    Entries(Vec<FeedEntry>),
    Report {
        #[serde(default)]
        entries: Vec<FeedEntry>,
        #[serde(default)]
        project_level: bool,
    },
}

/// Violation source that runs an analyzer printing feed entries as JSON
pub struct CommandViolationSource {
    name: String,
    kind: ViolationKind,
    command: CommandLine,
    timeout: Option<Duration>,
}

impl CommandViolationSource {
    pub fn new(kind: ViolationKind, command: &str) -> SweepResult<Self> {
        Ok(Self {
            name: format!("{}-command", kind),
            kind,
            command: CommandLine::parse(command)?,
            timeout: None,
        })
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    fn parse(&self, output: &CommandOutput) -> SweepResult<SourceReport> {
        let stdout = output.stdout.trim();
        if stdout.is_empty() {
            // A failing build with nothing attributable to a file
            if !output.success() && self.kind == ViolationKind::BuildError {
                return Ok(SourceReport::default().project_level());
            }
            if output.success() {
                return Ok(SourceReport::default());
            }
            return Err(SweepError::collection(&self.name, output.diagnostics()));
        }

        match serde_json::from_str::<Feed>(stdout) {
            Ok(Feed::Entries(entries)) => Ok(SourceReport::new(entries)),
            Ok(Feed::Report {
                entries,
                project_level,
            }) => Ok(SourceReport {
                entries,
                project_level,
            }),
            Err(e) if output.success() => Err(SweepError::collection(
                &self.name,
                format!("unreadable analyzer output: {}", e),
            )),
            Err(_) => Err(SweepError::collection(&self.name, output.diagnostics())),
        }
    }
}

#[async_trait]
impl ViolationSource for CommandViolationSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ViolationKind {
        self.kind
    }

    async fn query(&self, project: &Project) -> SweepResult<SourceReport> {
        let output = self
            .command
            .run(project.root(), &BTreeMap::new(), self.timeout)
            .await
            .map_err(|e| SweepError::collection(&self.name, e.to_string()))?;
        self.parse(&output)
    }
}

#[derive(Debug, Deserialize)]
struct SignalEntry {
    file: PathBuf,
    #[serde(flatten)]
    signals: FileSignals,
}

/// Signal source that runs a command printing `[{file, tdg, churn}]`
pub struct CommandSignalSource {
    command: CommandLine,
    timeout: Option<Duration>,
}

impl CommandSignalSource {
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
}

#[async_trait]
impl SignalSource for CommandSignalSource {
    fn name(&self) -> &str {
        "signals-command"
    }

    async fn signals(&self, project: &Project) -> SweepResult<BTreeMap<PathBuf, FileSignals>> {
        let output = self
            .command
            .run(project.root(), &BTreeMap::new(), self.timeout)
            .await?;
        if !output.success() {
            return Err(SweepError::collection(self.name(), output.diagnostics()));
        }
        let entries: Vec<SignalEntry> = serde_json::from_str(output.stdout.trim())?;
        Ok(entries.into_iter().map(|e| (e.file, e.signals)).collect())
    }
}
