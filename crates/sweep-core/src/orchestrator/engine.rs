//! The capability set shared by the batch and interactive drivers

use crate::checkpoints::{CheckpointStore, FileCheckpointStore};
use crate::config::{OrchestratorSettings, QualityProfile, SweepConfig};
use crate::error::{SweepError, SweepResult};
use crate::executor::{BatchExecutor, Transformer};
use crate::filter::PathFilter;
use crate::interrupt::InterruptManager;
use crate::orchestrator::observer::CommitObserver;
use crate::orchestrator::status::{OrchestratorHandle, StatusReport};
use crate::planner::PriorityPlanner;
use crate::validation::{QualityOracle, Validator};
use crate::violation::{Project, SignalSource, ViolationCollector, ViolationSource};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

/// Collector, planner, executor, validator and store for one project
pub struct Engine {
    pub(crate) project: Project,
    pub(crate) settings: OrchestratorSettings,
    pub(crate) collector: ViolationCollector,
    pub(crate) planner: PriorityPlanner,
    pub(crate) executor: BatchExecutor,
    pub(crate) validator: Validator,
    pub(crate) store: Arc<dyn CheckpointStore>,
    pub(crate) observers: Vec<Arc<dyn CommitObserver>>,
    pub(crate) interrupt: InterruptManager,
    pub(crate) status: watch::Sender<StatusReport>,
}

impl Engine {
    pub fn builder(project_root: impl Into<PathBuf>) -> EngineBuilder {
        EngineBuilder::new(project_root)
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn profile(&self) -> &QualityProfile {
        self.collector.profile()
    }

    pub fn store(&self) -> &Arc<dyn CheckpointStore> {
        &self.store
    }

    pub fn interrupt_manager(&self) -> &InterruptManager {
        &self.interrupt
    }

    pub fn executor(&self) -> &BatchExecutor {
        &self.executor
    }

    /// Operator handle for interrupting and observing the run
    pub fn handle(&self) -> OrchestratorHandle {
        OrchestratorHandle::new(self.interrupt.clone(), self.status.subscribe())
    }
}

/// Builder for an [`Engine`]
pub struct EngineBuilder {
    pub(crate) project_root: PathBuf,
    pub(crate) config: SweepConfig,
    pub(crate) sources: Vec<Arc<dyn ViolationSource>>,
    pub(crate) signals: Option<Arc<dyn SignalSource>>,
    pub(crate) oracle: Option<Arc<dyn QualityOracle>>,
    pub(crate) transformer: Option<Arc<dyn Transformer>>,
    pub(crate) store: Option<Arc<dyn CheckpointStore>>,
    pub(crate) observers: Vec<Arc<dyn CommitObserver>>,
    pub(crate) interrupt: Option<InterruptManager>,
    pub(crate) filter: Option<PathFilter>,
}

impl EngineBuilder {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            config: SweepConfig::default(),
            sources: Vec::new(),
            signals: None,
            oracle: None,
            transformer: None,
            store: None,
            observers: Vec::new(),
            interrupt: None,
            filter: None,
        }
    }

    pub fn with_config(mut self, config: SweepConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_source(mut self, source: Arc<dyn ViolationSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn QualityOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = Some(transformer);
        self
    }

    /// Defaults to a [`FileCheckpointStore`] under the configured checkpoint dir
    pub fn with_store(mut self, store: Arc<dyn CheckpointStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn CommitObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Share an interrupt manager with a signal handler
    pub fn with_interrupt(mut self, interrupt: InterruptManager) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Defaults to a filter built from the `[filter]` configuration
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self) -> SweepResult<Engine> {
        self.config.validate()?;

        let project = Project::new(self.project_root);
        let oracle = self
            .oracle
            .ok_or_else(|| SweepError::config("No build/test/coverage oracle configured"))?;
        let transformer = self
            .transformer
            .ok_or_else(|| SweepError::config("No transformation capability configured"))?;
        if self.sources.is_empty() {
            tracing::warn!("No violation sources configured, every run will complete clean");
        }

        let filter = match self.filter {
            Some(filter) => filter,
            None => PathFilter::from_config(&self.config.filter, project.root())?,
        };
        let mut collector = ViolationCollector::new(self.config.quality.clone()).with_filter(filter);
        for source in self.sources {
            collector = collector.with_source(source);
        }
        if let Some(signals) = self.signals {
            collector = collector.with_signals(signals);
        }

        let store = match self.store {
            Some(store) => store,
            None => Arc::new(FileCheckpointStore::new(
                project.resolve(&self.config.orchestrator.checkpoint_dir),
            )),
        };

        let settings = self.config.orchestrator;
        let (status, _) = watch::channel(StatusReport::default());

        Ok(Engine {
            executor: BatchExecutor::new(transformer, settings.workers),
            validator: Validator::new(oracle, self.config.gates),
            planner: PriorityPlanner::new(self.config.planner),
            collector,
            project,
            settings,
            store,
            observers: self.observers,
            interrupt: self.interrupt.unwrap_or_default(),
            status,
        })
    }
}
