//! Eligibility filtering for candidate files

use crate::config::FilterConfig;
use crate::error::{SweepError, SweepResult};
use glob::Pattern;
use std::path::Path;

/// Patterns excluded unless the caller supplies explicit include patterns
const DEFAULT_EXCLUDES: &[&str] = &[
    "tests/**",
    "benches/**",
    "**/test_*.rs",
    "**/*_test.rs",
    "**/fixtures/**",
];

/// Decides which project files may be scheduled for refactoring
#[derive(Debug, Clone, Default)]
pub struct PathFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    skip_special: bool,
}

impl PathFilter {
    /// A filter that accepts every file
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// A filter that accepts exactly one file. Absolute paths under the
    /// project root and a leading `./` are accepted.
    pub fn only(project_root: &Path, file: &Path) -> SweepResult<Self> {
        let relative = file.strip_prefix(project_root).unwrap_or(file);
        let relative = relative.strip_prefix(".").unwrap_or(relative);
        let pattern = Pattern::new(&Pattern::escape(&relative.to_string_lossy()))?;
        Ok(Self {
            include: vec![pattern],
            exclude: Vec::new(),
            skip_special: false,
        })
    }

    /// Build a filter from configuration, reading the ignore file if present
    pub fn from_config(config: &FilterConfig, project_root: &Path) -> SweepResult<Self> {
        let include = compile(&config.include)?;
        let mut exclude = compile(&config.exclude)?;

        if let Some(ignore_file) = &config.ignore_file {
            let path = if ignore_file.is_absolute() {
                ignore_file.clone()
            } else {
                project_root.join(ignore_file)
            };
            if path.exists() {
                let contents = std::fs::read_to_string(&path)
                    .map_err(|e| SweepError::io_at(e.to_string(), &path))?;
                let patterns = parse_ignore_file(&contents);
                tracing::debug!(
                    "Loaded {} patterns from {}",
                    patterns.len(),
                    path.display()
                );
                exclude.extend(compile(&patterns)?);
            }
        }

        let use_defaults = config.default_excludes && config.include.is_empty();
        if use_defaults {
            let defaults: Vec<String> = DEFAULT_EXCLUDES.iter().map(|p| p.to_string()).collect();
            exclude.extend(compile(&defaults)?);
        }

        Ok(Self {
            include,
            exclude,
            skip_special: use_defaults,
        })
    }

    /// Whether the file is eligible; paths are matched relative to the project root
    pub fn allows(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        if !self.include.is_empty() && !self.include.iter().any(|p| p.matches(&path_str)) {
            return false;
        }
        if self.exclude.iter().any(|p| p.matches(&path_str)) {
            return false;
        }
        !(self.skip_special && is_non_refactorable(path))
    }
}

fn compile(patterns: &[String]) -> SweepResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|p| Pattern::new(p).map_err(SweepError::from))
        .collect()
}

fn parse_ignore_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Build scripts and generated code are never rewritten
fn is_non_refactorable(path: &Path) -> bool {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let path_str = path.to_string_lossy();

    file_name == "build.rs" || path_str.contains("generated") || path_str.contains("/examples/")
}
