//! State machine tests against an on-disk working tree

use super::*;
use crate::checkpoints::{Checkpoint, CheckpointStore, MemoryCheckpointStore};
use crate::config::SweepConfig;
use crate::error::{SweepError, SweepResult};
use crate::executor::{TransformOutcome, Transformer};
use crate::interrupt::{InterruptManager, InterruptReason};
use crate::planner::{CompletionReason, Tier};
use crate::validation::{GateReport, QualityOracle};
use crate::violation::{FeedEntry, Project, SourceReport, Violation, ViolationKind, ViolationSource};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

fn marker(kind: ViolationKind) -> &'static str {
    match kind {
        ViolationKind::Lint => "LINT",
        ViolationKind::BuildError => "BUILD",
        ViolationKind::LowCoverage => "COVERAGE",
        ViolationKind::HighComplexity => "COMPLEXITY",
        ViolationKind::Satd => "TODO",
    }
}

/// Reports a violation for every marker line found in the project's `.rs` files
struct MarkerSource {
    kind: ViolationKind,
}

#[async_trait]
impl ViolationSource for MarkerSource {
    fn name(&self) -> &str {
        marker(self.kind)
    }

    fn kind(&self) -> ViolationKind {
        self.kind
    }

    async fn query(&self, project: &Project) -> SweepResult<SourceReport> {
        let mut entries = Vec::new();
        let mut paths: Vec<PathBuf> = std::fs::read_dir(project.root())?
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "rs"))
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            let lines: Vec<&str> = content
                .lines()
                .filter(|l| l.starts_with(marker(self.kind)))
                .collect();
            if lines.is_empty() {
                continue;
            }
            let reading = lines[0]
                .split_whitespace()
                .nth(1)
                .and_then(|n| n.parse::<f64>().ok())
                .unwrap_or(1.0);
            entries.push(FeedEntry::new(&path, reading).with_occurrences(lines.len() as u32));
        }
        Ok(SourceReport::new(entries))
    }
}

#[derive(Clone, Copy)]
enum Behavior {
    Fix,
    /// Leaves the file alone and reports failure
    Break,
    /// Reports success without changing anything the analyzer sees
    Sticky,
    /// Truncates the file, then the working tree becomes unwritable
    DiskFull,
}

/// Removes the marker lines of the violation's kind
struct MarkerFixer {
    behavior: HashMap<PathBuf, Behavior>,
    dispatched: Mutex<Vec<PathBuf>>,
    interrupt_on_call: Option<InterruptManager>,
}

impl MarkerFixer {
    fn new() -> Self {
        Self {
            behavior: HashMap::new(),
            dispatched: Mutex::new(Vec::new()),
            interrupt_on_call: None,
        }
    }

    fn with(mut self, file: &str, behavior: Behavior) -> Self {
        self.behavior.insert(PathBuf::from(file), behavior);
        self
    }

    fn dispatched(&self) -> Vec<PathBuf> {
        self.dispatched.lock().clone()
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
        self.dispatched.lock().push(violation.file.clone());
        if let Some(interrupt) = &self.interrupt_on_call {
            interrupt.interrupt(InterruptReason::UserInterrupt);
        }
        let path = project.resolve(&violation.file);
        match self
            .behavior
            .get(&violation.file)
            .copied()
            .unwrap_or(Behavior::Fix)
        {
            Behavior::Fix => {
                let content = std::fs::read_to_string(&path)?;
                let kept: Vec<&str> = content
                    .lines()
                    .filter(|l| !l.starts_with(marker(violation.kind)))
                    .collect();
                std::fs::write(&path, kept.join("\n"))?;
                Ok(TransformOutcome::Resolved)
            }
            Behavior::Break => {
                std::fs::write(&path, "garbage")?;
                Ok(TransformOutcome::unresolved("could not fix"))
            }
            Behavior::Sticky => Ok(TransformOutcome::Resolved),
            Behavior::DiskFull => {
                std::fs::write(&path, "")?;
                Err(SweepError::io_at("no space left on device", &violation.file))
            }
        }
    }
}

#[derive(Default)]
struct FakeOracle {
    fail_tests: AtomicBool,
    test_calls: AtomicUsize,
}

#[async_trait]
impl QualityOracle for FakeOracle {
    async fn build(&self, _project: &Project) -> SweepResult<GateReport> {
        Ok(GateReport::pass())
    }

    async fn test(&self, _project: &Project) -> SweepResult<GateReport> {
        self.test_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_tests.load(Ordering::SeqCst) {
            Ok(GateReport::fail("3 tests failed"))
        } else {
            Ok(GateReport::pass())
        }
    }

    async fn coverage(&self, _project: &Project) -> SweepResult<f64> {
        Ok(85.0)
    }
}

/// Accepts the first append, fails every one after it
#[derive(Default)]
struct BrokenStore {
    inner: MemoryCheckpointStore,
}

#[async_trait]
impl CheckpointStore for BrokenStore {
    async fn latest(&self) -> SweepResult<Option<Checkpoint>> {
        self.inner.latest().await
    }

    async fn latest_sequence(&self) -> SweepResult<Option<u64>> {
        self.inner.latest_sequence().await
    }

    async fn append(&self, checkpoint: &Checkpoint) -> SweepResult<()> {
        if checkpoint.sequence > 0 {
            return Err(SweepError::storage("disk full"));
        }
        self.inner.append(checkpoint).await
    }

    async fn load(&self, sequence: u64) -> SweepResult<Option<Checkpoint>> {
        self.inner.load(sequence).await
    }
}

struct RecordingObserver {
    events: Mutex<Vec<CommitEvent>>,
    fail: bool,
}

#[async_trait]
impl CommitObserver for RecordingObserver {
    fn name(&self) -> &str {
        "recording"
    }

    async fn on_commit(&self, event: &CommitEvent) -> SweepResult<()> {
        self.events.lock().push(event.clone());
        if self.fail {
            return Err(SweepError::other("vcs unavailable"));
        }
        Ok(())
    }
}

struct Fixture {
    dir: TempDir,
    store: Arc<dyn CheckpointStore>,
    oracle: Arc<FakeOracle>,
    config: SweepConfig,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            std::fs::write(dir.path().join(name), content).unwrap();
        }
        Self {
            dir,
            store: Arc::new(MemoryCheckpointStore::new()),
            oracle: Arc::new(FakeOracle::default()),
            config: SweepConfig::default(),
        }
    }

    fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(name)).unwrap()
    }

    fn builder(&self, fixer: Arc<MarkerFixer>) -> EngineBuilder {
        let mut builder = Engine::builder(self.dir.path())
            .with_config(self.config.clone())
            .with_oracle(self.oracle.clone())
            .with_transformer(fixer)
            .with_store(self.store.clone());
        for kind in ViolationKind::ALL {
            builder = builder.with_source(Arc::new(MarkerSource { kind }));
        }
        builder
    }

    fn orchestrator(&self, fixer: Arc<MarkerFixer>) -> Orchestrator {
        Orchestrator::new(self.builder(fixer).build().unwrap())
    }
}

#[tokio::test]
async fn test_lint_is_fixed_before_build_and_coverage() {
    let fixture = Fixture::new(&[
        ("a.rs", "LINT\nLINT\nfn a() {}"),
        ("b.rs", "BUILD\nfn b() {}"),
        ("c.rs", "COVERAGE 40\nfn c() {}"),
    ]);
    let fixer = Arc::new(MarkerFixer::new());
    let mut orchestrator = fixture.orchestrator(fixer.clone());

    orchestrator.start(StartMode::Fresh).await;
    assert_eq!(orchestrator.step().await, OrchestratorState::Planning);
    assert_eq!(orchestrator.step().await, OrchestratorState::Executing);
    let plan = &orchestrator.context().unwrap().plan;
    assert_eq!(plan.tier, Some(Tier::Lint));
    assert_eq!(plan.items.len(), 1);
    assert_eq!(plan.items[0].file, PathBuf::from("a.rs"));

    while !orchestrator.state().is_terminal() {
        orchestrator.step().await;
    }
    let summary = orchestrator.summary();
    assert_eq!(
        summary.outcome,
        RunOutcome::Complete {
            completion: CompletionReason::Clean
        }
    );
    assert_eq!(
        fixer.dispatched(),
        vec![
            PathBuf::from("a.rs"),
            PathBuf::from("b.rs"),
            PathBuf::from("c.rs")
        ]
    );
    assert_eq!(summary.sequence, Some(3));
    assert_eq!(summary.completed.len(), 3);
}

#[tokio::test]
async fn test_failed_validation_reverts_whole_batch() {
    let files: Vec<(String, String)> = (0..5)
        .map(|i| (format!("f{}.rs", i), format!("LINT\nfn f{}() {{}}\n", i)))
        .collect();
    let refs: Vec<(&str, &str)> = files
        .iter()
        .map(|(n, c)| (n.as_str(), c.as_str()))
        .collect();
    let fixture = Fixture::new(&refs);
    fixture.oracle.fail_tests.store(true, Ordering::SeqCst);

    let fixer = Arc::new(MarkerFixer::new());
    let mut orchestrator = fixture.orchestrator(fixer.clone());
    let summary = orchestrator.run(StartMode::Fresh).await;

    assert_eq!(
        summary.outcome,
        RunOutcome::Complete {
            completion: CompletionReason::Exhausted { tier: Tier::Lint }
        }
    );
    assert_eq!(fixer.dispatched().len(), 5);
    assert_eq!(fixture.oracle.test_calls.load(Ordering::SeqCst), 1);
    for (name, content) in &files {
        assert_eq!(&fixture.read(name), content);
    }
    assert_eq!(summary.skipped.len(), 5);
    assert!(
        summary.skipped[0]
            .reason
            .as_deref()
            .unwrap()
            .contains("3 tests failed")
    );
    assert_eq!(fixture.store.latest_sequence().await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_local_failure_returns_siblings_to_queue() {
    let mut fixture = Fixture::new(&[
        ("bad.rs", "LINT\nLINT\nLINT\n"),
        ("good.rs", "LINT\n"),
    ]);
    fixture.config.orchestrator.max_attempts_per_file = 2;
    let fixer = Arc::new(MarkerFixer::new().with("bad.rs", Behavior::Break));
    let mut orchestrator = fixture.orchestrator(fixer.clone());
    let summary = orchestrator.run(StartMode::Fresh).await;

    // good.rs is dispatched with bad.rs, rolled back, then committed alone
    let dispatched = fixer.dispatched();
    assert_eq!(dispatched.len(), 4);
    assert_eq!(
        dispatched[2..],
        [PathBuf::from("good.rs"), PathBuf::from("bad.rs")]
    );
    assert_eq!(fixture.read("bad.rs"), "LINT\nLINT\nLINT\n");
    assert_eq!(fixture.read("good.rs"), "");
    assert_eq!(summary.completed, vec![PathBuf::from("good.rs")]);
    assert_eq!(summary.given_up.len(), 1);
    assert_eq!(
        summary.outcome,
        RunOutcome::Complete {
            completion: CompletionReason::Exhausted { tier: Tier::Lint }
        }
    );
}

#[tokio::test]
async fn test_resume_does_not_reattempt_succeeded_files() {
    let mut fixture = Fixture::new(&[("a.rs", "LINT\n"), ("b.rs", "LINT\n")]);
    fixture.config.orchestrator.batch_size = 1;
    fixture.config.orchestrator.max_cycles = Some(1);

    let fixer = Arc::new(MarkerFixer::new().with("a.rs", Behavior::Sticky));
    let mut first = fixture.orchestrator(fixer.clone());
    let summary = first.run(StartMode::Fresh).await;
    assert_eq!(
        summary.outcome,
        RunOutcome::Aborted {
            abort: AbortReason::CycleBudget
        }
    );
    assert_eq!(summary.completed, vec![PathBuf::from("a.rs")]);
    let run_id = fixture.store.latest().await.unwrap().unwrap().run_id;

    fixture.config.orchestrator.max_cycles = None;
    let fixer = Arc::new(MarkerFixer::new().with("a.rs", Behavior::Sticky));
    let mut resumed = fixture.orchestrator(fixer.clone());
    let summary = resumed.run(StartMode::Resume).await;

    assert_eq!(fixer.dispatched(), vec![PathBuf::from("b.rs")]);
    assert_eq!(summary.completed.len(), 2);
    let latest = fixture.store.latest().await.unwrap().unwrap();
    assert_eq!(latest.run_id, run_id);
    assert_eq!(latest.sequence, 2);
}

#[tokio::test]
async fn test_fresh_start_continues_numbering() {
    let fixture = Fixture::new(&[("a.rs", "LINT\n")]);
    let mut first = fixture.orchestrator(Arc::new(MarkerFixer::new()));
    first.run(StartMode::Fresh).await;
    assert_eq!(fixture.store.latest_sequence().await.unwrap(), Some(1));

    std::fs::write(fixture.dir.path().join("a.rs"), "LINT\n").unwrap();
    let mut second = fixture.orchestrator(Arc::new(MarkerFixer::new()));
    let summary = second.run(StartMode::Fresh).await;
    assert_eq!(summary.sequence, Some(3));
    let latest = fixture.store.latest().await.unwrap().unwrap();
    assert_eq!(latest.ledger.completed().count(), 1);
}

#[tokio::test]
async fn test_interrupt_waits_for_batch_boundary() {
    let fixture = Fixture::new(&[("a.rs", "LINT\n"), ("b.rs", "LINT\n")]);
    let interrupt = InterruptManager::new();
    let mut fixer = MarkerFixer::new();
    fixer.interrupt_on_call = Some(interrupt.clone());
    let fixer = Arc::new(fixer);

    let engine = fixture
        .builder(fixer.clone())
        .with_interrupt(interrupt)
        .build()
        .unwrap();
    let mut orchestrator = Orchestrator::new(engine);
    let summary = orchestrator.run(StartMode::Fresh).await;

    assert_eq!(
        summary.outcome,
        RunOutcome::Aborted {
            abort: AbortReason::Interrupted
        }
    );
    // the in-flight batch finished and was committed
    assert_eq!(fixer.dispatched().len(), 2);
    assert_eq!(fixture.read("a.rs"), "");
    assert_eq!(fixture.store.latest_sequence().await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_interrupt_before_first_batch() {
    let fixture = Fixture::new(&[("a.rs", "LINT\n")]);
    let fixer = Arc::new(MarkerFixer::new());
    let mut orchestrator = fixture.orchestrator(fixer.clone());
    let handle = orchestrator.handle();
    handle.interrupt();

    let summary = orchestrator.run(StartMode::Fresh).await;
    assert!(fixer.dispatched().is_empty());
    assert_eq!(
        summary.outcome,
        RunOutcome::Aborted {
            abort: AbortReason::Interrupted
        }
    );
    let status = handle.status();
    assert_eq!(status.state, OrchestratorState::Aborted);
    assert_eq!(status.queue_depth.get(&Tier::Lint), Some(&1));
}

#[tokio::test]
async fn test_runtime_budget_aborts_at_boundary() {
    let mut fixture = Fixture::new(&[("a.rs", "LINT\n")]);
    fixture.config.orchestrator.max_runtime = Some(Duration::ZERO);
    let mut orchestrator = fixture.orchestrator(Arc::new(MarkerFixer::new()));
    let summary = orchestrator.run(StartMode::Fresh).await;
    assert_eq!(
        summary.outcome,
        RunOutcome::Aborted {
            abort: AbortReason::RuntimeBudget
        }
    );
}

#[tokio::test]
async fn test_unwritable_store_aborts_run() {
    let mut fixture = Fixture::new(&[("a.rs", "LINT\n")]);
    fixture.store = Arc::new(BrokenStore::default());
    let mut orchestrator = fixture.orchestrator(Arc::new(MarkerFixer::new()));
    let summary = orchestrator.run(StartMode::Fresh).await;

    match summary.outcome {
        RunOutcome::Aborted {
            abort: AbortReason::Fatal { message },
        } => assert!(message.contains("disk full")),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(fixture.store.latest_sequence().await.unwrap(), Some(0));
    assert_eq!(fixture.read("a.rs"), "LINT\n");
}

#[tokio::test]
async fn test_fatal_transformer_error_aborts_run() {
    let fixture = Fixture::new(&[("a.rs", "LINT\n"), ("b.rs", "LINT\n")]);
    let fixer = MarkerFixer::new().with("b.rs", Behavior::DiskFull);
    let mut orchestrator = fixture.orchestrator(Arc::new(fixer));
    let summary = orchestrator.run(StartMode::Fresh).await;

    match summary.outcome {
        RunOutcome::Aborted {
            abort: AbortReason::Fatal { message },
        } => assert!(message.contains("no space left"), "{}", message),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert!(summary.skipped.is_empty());
    assert_eq!(fixture.read("a.rs"), "LINT\n");
    assert_eq!(fixture.read("b.rs"), "LINT\n");
    assert_eq!(fixture.store.latest_sequence().await.unwrap(), Some(0));
}

#[tokio::test]
async fn test_observers_run_after_checkpoint() {
    let fixture = Fixture::new(&[("a.rs", "LINT\n"), ("b.rs", "BUILD\n")]);
    let failing = Arc::new(RecordingObserver {
        events: Mutex::new(Vec::new()),
        fail: true,
    });
    let engine = fixture
        .builder(Arc::new(MarkerFixer::new()))
        .with_observer(failing.clone())
        .build()
        .unwrap();
    let summary = Orchestrator::new(engine).run(StartMode::Fresh).await;

    assert!(matches!(summary.outcome, RunOutcome::Complete { .. }));
    let events = failing.events.lock().clone();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].sequence, 1);
    assert_eq!(events[0].tier, Tier::Lint);
    assert_eq!(events[1].files, vec![PathBuf::from("b.rs")]);
}

#[tokio::test]
async fn test_analyzing_twice_is_idempotent() {
    let fixture = Fixture::new(&[("a.rs", "LINT\nLINT\n"), ("b.rs", "LINT\n")]);
    let engine = fixture
        .builder(Arc::new(MarkerFixer::new()))
        .build()
        .unwrap();
    let mut ctx = engine.begin(StartMode::Fresh).await.unwrap();

    engine.analyze(&mut ctx).await;
    engine.plan(&mut ctx);
    let (first_collection, first_plan) = (ctx.collection.clone(), ctx.plan.clone());
    engine.analyze(&mut ctx).await;
    engine.plan(&mut ctx);

    assert_eq!(ctx.collection, first_collection);
    assert_eq!(ctx.plan, first_plan);
}

mod interactive {
    use super::*;

    #[tokio::test]
    async fn test_accept_commits_and_reanalyzes() {
        let fixture = Fixture::new(&[("a.rs", "LINT\n"), ("b.rs", "BUILD\n")]);
        let engine = fixture
            .builder(Arc::new(MarkerFixer::new()))
            .build()
            .unwrap();
        let mut driver = InteractiveDriver::start(engine, StartMode::Fresh)
            .await
            .unwrap();

        let session = driver.open_session().await.unwrap().unwrap();
        assert_eq!(session.file(), Path::new("a.rs"));
        assert_eq!(session.pre_image().content(), Some(&b"LINT\n"[..]));
        assert_eq!(
            session.proposed_content().await.unwrap(),
            Some(Vec::new())
        );
        assert_eq!(
            session.accept().await.unwrap(),
            SessionOutcome::Committed { sequence: 1 }
        );
        assert_eq!(driver.state(), OrchestratorState::Planning);

        let session = driver.open_session().await.unwrap().unwrap();
        assert_eq!(session.item().tier(), Tier::BuildError);
        session.accept().await.unwrap();

        assert!(driver.open_session().await.unwrap().is_none());
        assert_eq!(
            driver.outcome(),
            Some(&RunOutcome::Complete {
                completion: CompletionReason::Clean
            })
        );
    }

    #[tokio::test]
    async fn test_reject_counts_attempt_and_skip_does_not() {
        let mut fixture = Fixture::new(&[("a.rs", "LINT\nLINT\n"), ("b.rs", "LINT\n")]);
        fixture.config.orchestrator.max_attempts_per_file = 1;
        let engine = fixture
            .builder(Arc::new(MarkerFixer::new()))
            .build()
            .unwrap();
        let mut driver = InteractiveDriver::start(engine, StartMode::Fresh)
            .await
            .unwrap();

        let session = driver.open_session().await.unwrap().unwrap();
        assert_eq!(session.file(), Path::new("a.rs"));
        assert_eq!(session.reject().await.unwrap(), SessionOutcome::Rejected);
        assert_eq!(fixture.read("a.rs"), "LINT\nLINT\n");

        let session = driver.open_session().await.unwrap().unwrap();
        assert_eq!(session.file(), Path::new("b.rs"));
        assert_eq!(session.skip().await.unwrap(), SessionOutcome::Skipped);

        assert!(driver.open_session().await.unwrap().is_none());
        let summary = driver.summary();
        assert_eq!(summary.given_up, vec![FileNote {
            file: PathBuf::from("a.rs"),
            reason: Some("rejected by operator".to_string()),
        }]);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(
            driver
                .context()
                .checkpoint
                .ledger
                .get(Path::new("b.rs"))
                .unwrap()
                .attempts,
            0
        );
    }

    #[tokio::test]
    async fn test_accept_with_failing_tests_reverts() {
        let fixture = Fixture::new(&[("a.rs", "LINT\n")]);
        fixture.oracle.fail_tests.store(true, Ordering::SeqCst);
        let engine = fixture
            .builder(Arc::new(MarkerFixer::new()))
            .build()
            .unwrap();
        let mut driver = InteractiveDriver::start(engine, StartMode::Fresh)
            .await
            .unwrap();

        let session = driver.open_session().await.unwrap().unwrap();
        let outcome = session.accept().await.unwrap();
        assert!(matches!(outcome, SessionOutcome::ValidationFailed { .. }));
        assert_eq!(fixture.read("a.rs"), "LINT\n");
        assert_eq!(fixture.store.latest_sequence().await.unwrap(), Some(0));
    }
}
