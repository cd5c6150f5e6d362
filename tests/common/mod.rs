//! Shared fakes for the end-to-end scenarios
//!
//! Files under `src/` carry marker lines (`LINT`, `BUILD`, `COVERAGE <pct>`,
//! `COMPLEXITY <n>`, `TODO`) that the fake analyzers report and the fake
//! fixer deletes.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use sweep::{
    CommitEvent, CommitObserver, EngineBuilder, FeedEntry, GateReport, InterruptManager,
    InterruptReason, Project, QualityOracle, SourceReport, SweepConfig, SweepResult,
    TransformOutcome, Transformer, Violation, ViolationKind, ViolationSource,
};
use tempfile::TempDir;

pub fn marker(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::Lint => "LINT",
        ViolationKind::BuildError => "BUILD",
        ViolationKind::LowCoverage => "COVERAGE",
        ViolationKind::HighComplexity => "COMPLEXITY",
        ViolationKind::Satd => "TODO",
    }
}

/// A scratch project with a `src/` directory
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        let workspace = Self { dir };
        for (name, content) in files {
            workspace.write(name, content);
        }
        workspace
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, content: &str) {
        std::fs::write(self.root().join("src").join(name), content).unwrap();
    }

    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.root().join("src").join(name)).unwrap()
    }

    /// Every file under `src/` with its content
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let mut files: Vec<(String, String)> = std::fs::read_dir(self.root().join("src"))
            .unwrap()
            .map(|e| {
                let path = e.unwrap().path();
                let name = path.file_name().unwrap().to_string_lossy().into_owned();
                (name, std::fs::read_to_string(&path).unwrap())
            })
            .collect();
        files.sort();
        files
    }

    /// Builder wired with marker analyzers for every kind
    pub fn builder(
        &self,
        config: SweepConfig,
        oracle: Arc<ScriptedOracle>,
        fixer: Arc<MarkerFixer>,
    ) -> EngineBuilder {
        let mut builder = sweep::Engine::builder(self.root())
            .with_config(config)
            .with_oracle(oracle)
            .with_transformer(fixer);
        for kind in ViolationKind::ALL {
            builder = builder.with_source(Arc::new(MarkerAnalyzer { kind }));
        }
        builder
    }
}

pub struct MarkerAnalyzer {
    pub kind: ViolationKind,
}

#[async_trait]
impl ViolationSource for MarkerAnalyzer {
    fn name(&self) -> &str {
        marker(self.kind)
    }

    fn kind(&self) -> ViolationKind {
        self.kind
    }

    async fn query(&self, project: &Project) -> SweepResult<SourceReport> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(project.root().join("src"))? {
            let path = entry?.path();
            let content = std::fs::read_to_string(&path)?;
            let hits: Vec<&str> = content
                .lines()
                .filter(|l| l.starts_with(marker(self.kind)))
                .collect();
            let Some(first) = hits.first() else {
                continue;
            };
            let reading = first
                .split_whitespace()
                .nth(1)
                .and_then(|n| n.parse::<f64>().ok())
                .unwrap_or(hits.len() as f64);
            entries.push(
                FeedEntry::new(&path, reading)
                    .with_occurrences(hits.len() as u32)
                    .with_evidence(first.to_string()),
            );
        }
        Ok(SourceReport::new(entries))
    }
}

/// Deletes marker lines; files listed as stubborn are left broken
#[derive(Default)]
pub struct MarkerFixer {
    stubborn: Vec<PathBuf>,
    calls: Mutex<Vec<PathBuf>>,
    interrupt_after: Mutex<Option<(usize, InterruptManager)>>,
}

impl MarkerFixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stubborn(mut self, name: &str) -> Self {
        self.stubborn.push(Path::new("src").join(name));
        self
    }

    /// Raise an interrupt while the n-th transformation runs
    pub fn interrupt_on_call(self, n: usize, interrupt: InterruptManager) -> Self {
        *self.interrupt_after.lock() = Some((n, interrupt));
        self
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transformer for MarkerFixer {
    fn name(&self) -> &str {
        "marker-fixer"
    }

    async fn transform(
        &self,
        project: &Project,
        violation: &Violation,
    ) -> SweepResult<TransformOutcome> {
        let call = {
            let mut calls = self.calls.lock();
            calls.push(violation.file.clone());
            calls.len()
        };
        if let Some((n, interrupt)) = self.interrupt_after.lock().as_ref() {
            if *n == call {
                interrupt.interrupt(InterruptReason::UserInterrupt);
            }
        }

        let path = project.resolve(&violation.file);
        if self.stubborn.contains(&violation.file) {
            std::fs::write(&path, "half-written")?;
            return Ok(TransformOutcome::unresolved("could not rewrite"));
        }
        let content = std::fs::read_to_string(&path)?;
        let kept: Vec<&str> = content
            .lines()
            .filter(|l| !l.starts_with(marker(violation.kind)))
            .collect();
        std::fs::write(&path, kept.join("\n"))?;
        Ok(TransformOutcome::Resolved)
    }
}

/// Oracle whose test and coverage answers are queued up front
pub struct ScriptedOracle {
    test_failures: AtomicUsize,
    coverage: Mutex<VecDeque<f64>>,
    fallback_coverage: f64,
    pub test_runs: AtomicUsize,
}

impl ScriptedOracle {
    pub fn passing() -> Arc<Self> {
        Arc::new(Self::with(0, &[]))
    }

    /// The next `failures` test runs fail, coverage readings follow `coverage`
    pub fn with(failures: usize, coverage: &[f64]) -> Self {
        Self {
            test_failures: AtomicUsize::new(failures),
            coverage: Mutex::new(coverage.iter().copied().collect()),
            fallback_coverage: 90.0,
            test_runs: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl QualityOracle for ScriptedOracle {
    async fn build(&self, _project: &Project) -> SweepResult<GateReport> {
        Ok(GateReport::pass())
    }

    async fn test(&self, _project: &Project) -> SweepResult<GateReport> {
        self.test_runs.fetch_add(1, Ordering::SeqCst);
        let failing = self
            .test_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Ok(GateReport::fail("test suite failed"))
        } else {
            Ok(GateReport::pass())
        }
    }

    async fn coverage(&self, _project: &Project) -> SweepResult<f64> {
        Ok(self
            .coverage
            .lock()
            .pop_front()
            .unwrap_or(self.fallback_coverage))
    }
}

/// Records commits and optionally interrupts after the n-th one
#[derive(Default)]
pub struct CommitLog {
    pub events: Mutex<Vec<CommitEvent>>,
    interrupt_after: Option<(usize, InterruptManager)>,
}

impl CommitLog {
    pub fn interrupting_after(n: usize, interrupt: InterruptManager) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            interrupt_after: Some((n, interrupt)),
        }
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.events
            .lock()
            .iter()
            .flat_map(|e| e.files.clone())
            .collect()
    }
}

#[async_trait]
impl CommitObserver for CommitLog {
    fn name(&self) -> &str {
        "commit-log"
    }

    async fn on_commit(&self, event: &CommitEvent) -> SweepResult<()> {
        let count = {
            let mut events = self.events.lock();
            events.push(event.clone());
            events.len()
        };
        if let Some((n, interrupt)) = &self.interrupt_after {
            if count == *n {
                interrupt.interrupt(InterruptReason::UserInterrupt);
            }
        }
        Ok(())
    }
}

/// Count how often each file was handed to the fixer
pub fn call_counts(calls: &[PathBuf]) -> HashMap<PathBuf, usize> {
    let mut counts = HashMap::new();
    for call in calls {
        *counts.entry(call.clone()).or_default() += 1;
    }
    counts
}
