//! Utility functions for the CLI.

use arcstream_archive::Predicate;
use arcstream_core::Reader;
use glob::{Pattern, PatternError};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Entry name filter built from `--include` / `--exclude` globs.
///
/// An entry passes when it matches no exclude pattern and, if include
/// patterns are given, at least one of them.
pub struct GlobFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl GlobFilter {
    /// Compile the patterns.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self, PatternError> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>, PatternError> {
            patterns.iter().map(|p| Pattern::new(p)).collect()
        };
        Ok(Self {
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }

    /// Whether no pattern was given.
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Check a single name.
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| p.matches(name))
    }
}

impl Predicate for GlobFilter {
    fn is_true(&self, source: &dyn Reader) -> bool {
        self.matches(&source.filename())
    }
}

/// Spinner counting processed entries.
pub fn create_spinner(enable: bool) -> Result<ProgressBar, Box<dyn std::error::Error>> {
    if !enable {
        return Ok(ProgressBar::hidden());
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{elapsed_precise}] {pos} files {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Format a size for the listing table.
pub fn format_size(size: Option<u64>) -> String {
    match size {
        Some(size) => size.to_string(),
        None => "-".to_string(),
    }
}
