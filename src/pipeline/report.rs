//! Per-file outcomes and the end-of-run report

use std::path::{Path, PathBuf};

use crate::error::{IngestError, Stage};
use crate::identity::ResolvedBy;

/// A file that made it all the way into the store
#[derive(Debug, Clone, PartialEq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub game_key: String,
    pub resolved_by: ResolvedBy,
    /// Derived rows written
    pub rows: usize,
    /// Rows of an earlier run that were replaced
    pub replaced: usize,
    /// Repairs applied while decoding
    pub repairs: usize,
}

/// A file that was skipped, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipRecord {
    pub path: PathBuf,
    pub stage: Stage,
    pub message: String,
}

impl SkipRecord {
    pub fn from_error(path: &Path, err: &IngestError) -> Self {
        Self {
            path: path.to_path_buf(),
            stage: err.stage(),
            message: err.to_string(),
        }
    }
}

/// Totals of one batch run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub discovered: usize,
    pub processed: usize,
    pub rows: usize,
    pub placeholders_created: usize,
    pub repaired_files: usize,
    pub skipped: Vec<SkipRecord>,
}

impl BatchReport {
    pub fn new(discovered: usize) -> Self {
        Self {
            discovered,
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, outcome: &FileOutcome) {
        self.processed += 1;
        self.rows += outcome.rows;
        if outcome.resolved_by == ResolvedBy::NewPlaceholder {
            self.placeholders_created += 1;
        }
        if outcome.repairs > 0 {
            self.repaired_files += 1;
        }
    }

    pub fn record_skip(&mut self, skip: SkipRecord) {
        self.skipped.push(skip);
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    /// Human-readable summary, skipped files listed last
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str("\nIngest summary:\n");
        output.push_str(&format!("  Files found:          {}\n", self.discovered));
        output.push_str(&format!("  Files processed:      {}\n", self.processed));
        output.push_str(&format!("  Files skipped:        {}\n", self.skipped_count()));
        output.push_str(&format!("  Derived rows:         {}\n", self.rows));
        output.push_str(&format!(
            "  Placeholder games:    {}\n",
            self.placeholders_created
        ));
        output.push_str(&format!("  Repaired files:       {}\n", self.repaired_files));

        if !self.skipped.is_empty() {
            output.push_str("\nSkipped:\n");
            for skip in &self.skipped {
                output.push_str(&format!(
                    "  [{:>7}] {}: {}\n",
                    skip.stage.label(),
                    skip.path.display(),
                    skip.message
                ));
            }
        }

        output
    }
}
