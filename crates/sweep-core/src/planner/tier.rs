//! Priority tiers

use crate::violation::ViolationKind;
use serde::{Deserialize, Serialize};

/// One of the four strictly ordered violation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Lint,
    BuildError,
    LowCoverage,
    /// High complexity and self-admitted technical debt
    ExtremeQuality,
}

impl Tier {
    /// Tiers in evaluation order
    pub const ORDERED: [Tier; 4] = [
        Self::Lint,
        Self::BuildError,
        Self::LowCoverage,
        Self::ExtremeQuality,
    ];

    pub fn for_kind(kind: ViolationKind) -> Self {
        match kind {
            ViolationKind::Lint => Self::Lint,
            ViolationKind::BuildError => Self::BuildError,
            ViolationKind::LowCoverage => Self::LowCoverage,
            ViolationKind::HighComplexity | ViolationKind::Satd => Self::ExtremeQuality,
        }
    }

    pub fn kinds(&self) -> &'static [ViolationKind] {
        match self {
            Self::Lint => &[ViolationKind::Lint],
            Self::BuildError => &[ViolationKind::BuildError],
            Self::LowCoverage => &[ViolationKind::LowCoverage],
            Self::ExtremeQuality => &[ViolationKind::HighComplexity, ViolationKind::Satd],
        }
    }

    pub fn contains(&self, kind: ViolationKind) -> bool {
        Self::for_kind(kind) == *self
    }

    /// 1-based priority as reported to operators
    pub fn rank(&self) -> u8 {
        match self {
            Self::Lint => 1,
            Self::BuildError => 2,
            Self::LowCoverage => 3,
            Self::ExtremeQuality => 4,
        }
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lint => write!(f, "lint"),
            Self::BuildError => write!(f, "build-error"),
            Self::LowCoverage => write!(f, "low-coverage"),
            Self::ExtremeQuality => write!(f, "extreme-quality"),
        }
    }
}
