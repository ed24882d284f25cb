//! Run result module.
//!
//! Aggregates what a run did: shots and renames, warnings, codecs that were
//! unavailable, and per-codec job counts. Serializable for `--json` output.

use crate::dispatch::{JobOutcome, JobReport};
use crate::encode::Codec;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Job counts for one codec.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CodecTally {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl CodecTally {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }
}

/// A job that did not produce output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedJob {
    pub source: String,
    pub codec: Codec,
    pub error: String,
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunResult {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub assets_found: usize,
    pub shots: usize,
    pub renames: usize,
    pub warnings: Vec<String>,
    /// Codecs switched off in the settings.
    pub skipped_codecs: Vec<Codec>,
    /// Codecs disabled because tools are missing, with the missing tools.
    pub unavailable_codecs: BTreeMap<Codec, Vec<String>>,
    pub codecs: BTreeMap<Codec, CodecTally>,
    pub failures: Vec<FailedJob>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl RunResult {
    pub fn new(input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            input_dir,
            output_dir,
            ..Self::default()
        }
    }

    /// Counts a finished job.
    pub fn record(&mut self, report: &JobReport) {
        let tally = self.codecs.entry(report.job.codec).or_default();
        match &report.outcome {
            JobOutcome::Succeeded => tally.succeeded += 1,
            JobOutcome::Cancelled => tally.cancelled += 1,
            JobOutcome::Failed(error) => {
                tally.failed += 1;
                self.failures.push(FailedJob {
                    source: report
                        .job
                        .source
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    codec: report.job.codec,
                    error: error.clone(),
                });
            }
        }
    }

    pub fn jobs_succeeded(&self) -> usize {
        self.codecs.values().map(|t| t.succeeded).sum()
    }

    pub fn jobs_failed(&self) -> usize {
        self.codecs.values().map(|t| t.failed).sum()
    }

    pub fn jobs_cancelled(&self) -> usize {
        self.codecs.values().map(|t| t.cancelled).sum()
    }

    pub fn jobs_total(&self) -> usize {
        self.codecs.values().map(CodecTally::total).sum()
    }

    /// Human-readable summary, one line per entry.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Processed {} shots from {} files; {} renamed into {}",
            self.shots,
            self.assets_found,
            self.renames,
            self.output_dir.display()
        )];

        for codec in Codec::ALL {
            if let Some(tally) = self.codecs.get(&codec) {
                let mut line = format!(
                    "{}: {} succeeded, {} failed",
                    codec, tally.succeeded, tally.failed
                );
                if tally.cancelled > 0 {
                    line.push_str(&format!(", {} cancelled", tally.cancelled));
                }
                lines.push(line);
            } else if let Some(missing) = self.unavailable_codecs.get(&codec) {
                lines.push(format!("{}: unavailable (missing {})", codec, missing.join(", ")));
            } else if self.skipped_codecs.contains(&codec) {
                lines.push(format!("{}: switched off", codec));
            }
        }

        if !self.warnings.is_empty() {
            lines.push(format!("{} warnings", self.warnings.len()));
        }
        if self.cancelled {
            lines.push("Run was cancelled".to_string());
        }
        lines
    }
}

impl std::fmt::Display for RunResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for line in self.summary_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
