//! Violation collection across all configured sources

use crate::config::QualityProfile;
use crate::filter::PathFilter;
use crate::violation::source::{FeedEntry, FileSignals, SignalSource, ViolationSource};
use crate::violation::types::{Project, Revision, Violation, ViolationKind};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A source that could not be queried during collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Degradation {
    pub source: String,
    /// `None` for the tie-break signal source
    pub kind: Option<ViolationKind>,
    pub reason: String,
}

/// The normalized result of one Analyzing phase
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    pub revision: Revision,
    /// Sorted by (file, kind), at most one entry per pair
    pub violations: Vec<Violation>,
    /// Kinds reported as failing for the project as a whole
    pub project_level: BTreeSet<ViolationKind>,
    pub signals: BTreeMap<PathBuf, FileSignals>,
    pub degraded: Vec<Degradation>,
}

impl Collection {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty() && self.project_level.is_empty()
    }

    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    /// Whether the kind is present anywhere, attributed or not
    pub fn has_kind(&self, kind: ViolationKind) -> bool {
        self.project_level.contains(&kind) || self.violations.iter().any(|v| v.kind == kind)
    }

    pub fn is_degraded(&self, kind: ViolationKind) -> bool {
        self.degraded.iter().any(|d| d.kind == Some(kind))
    }

    pub fn signals_for(&self, file: &Path) -> FileSignals {
        self.signals.get(file).copied().unwrap_or_default()
    }

    /// Number of distinct files with at least one violation
    pub fn files_with_issues(&self) -> usize {
        self.violations
            .iter()
            .map(|v| &v.file)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Queries every violation source and produces a normalized [`Collection`]
pub struct ViolationCollector {
    sources: Vec<Arc<dyn ViolationSource>>,
    signals: Option<Arc<dyn SignalSource>>,
    profile: QualityProfile,
    filter: PathFilter,
}

impl ViolationCollector {
    pub fn new(profile: QualityProfile) -> Self {
        Self {
            sources: Vec::new(),
            signals: None,
            profile,
            filter: PathFilter::allow_all(),
        }
    }

    pub fn with_source(mut self, source: Arc<dyn ViolationSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_signals(mut self, signals: Arc<dyn SignalSource>) -> Self {
        self.signals = Some(signals);
        self
    }

    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn profile(&self) -> &QualityProfile {
        &self.profile
    }

    /// Collect violations from every source.
    ///
    /// Never fails: a source that errors contributes zero violations and a
    /// [`Degradation`] entry.
    pub async fn collect(&self, project: &Project, revision: Revision) -> Collection {
        let mut merged: BTreeMap<(PathBuf, ViolationKind), Violation> = BTreeMap::new();
        let mut project_level = BTreeSet::new();
        let mut degraded = Vec::new();

        let reports = join_all(self.sources.iter().map(|source| source.query(project))).await;
        for (source, result) in self.sources.iter().zip(reports) {
            let kind = source.kind();
            match result {
                Ok(report) => {
                    tracing::debug!(
                        source = source.name(),
                        kind = %kind,
                        entries = report.entries.len(),
                        "Collected violation feed"
                    );
                    if report.project_level {
                        project_level.insert(kind);
                    }
                    for entry in report.entries {
                        if let Some(violation) = self.normalize(project, kind, entry, revision) {
                            merge_into(&mut merged, violation);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        source = source.name(),
                        kind = %kind,
                        error = %e,
                        "Violation source unavailable, continuing without it"
                    );
                    degraded.push(Degradation {
                        source: source.name().to_string(),
                        kind: Some(kind),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let signals = match &self.signals {
            Some(source) => match source.signals(project).await {
                Ok(signals) => signals
                    .into_iter()
                    .map(|(file, s)| (project.relativize(&file), s))
                    .collect(),
                Err(e) => {
                    tracing::warn!(source = source.name(), error = %e, "Signal source unavailable");
                    degraded.push(Degradation {
                        source: source.name().to_string(),
                        kind: None,
                        reason: e.to_string(),
                    });
                    BTreeMap::new()
                }
            },
            None => BTreeMap::new(),
        };

        let violations: Vec<Violation> = merged
            .into_values()
            .filter(|v| self.exceeds_threshold(v))
            .collect();

        tracing::info!(
            revision = %revision,
            violations = violations.len(),
            degraded = degraded.len(),
            "Collection complete"
        );

        Collection {
            revision,
            violations,
            project_level,
            signals,
            degraded,
        }
    }

    fn normalize(
        &self,
        project: &Project,
        kind: ViolationKind,
        entry: FeedEntry,
        revision: Revision,
    ) -> Option<Violation> {
        let file = project.relativize(&entry.file);
        if !self.filter.allows(&file) {
            return None;
        }

        let severity = match kind {
            ViolationKind::LowCoverage => (100.0 - entry.severity).clamp(0.0, 100.0),
            _ => entry.severity,
        };

        Some(Violation {
            file,
            kind,
            severity,
            occurrences: entry.occurrences,
            evidence: entry.evidence,
            revision,
        })
    }

    fn exceeds_threshold(&self, violation: &Violation) -> bool {
        match violation.kind {
            ViolationKind::Lint | ViolationKind::BuildError => violation.occurrences > 0,
            ViolationKind::LowCoverage => violation.severity > 100.0 - self.profile.coverage_min,
            ViolationKind::HighComplexity => {
                violation.severity > f64::from(self.profile.complexity_max)
            }
            ViolationKind::Satd => violation.occurrences > self.profile.satd_allowed,
        }
    }
}

/// Keep the highest-severity record per (file, kind) and sum occurrences
fn merge_into(merged: &mut BTreeMap<(PathBuf, ViolationKind), Violation>, violation: Violation) {
    let key = (violation.file.clone(), violation.kind);
    match merged.get_mut(&key) {
        Some(existing) => {
            let occurrences = existing.occurrences.saturating_add(violation.occurrences);
            if violation.severity > existing.severity {
                *existing = violation;
            }
            existing.occurrences = occurrences;
        }
        None => {
            merged.insert(key, violation);
        }
    }
}
