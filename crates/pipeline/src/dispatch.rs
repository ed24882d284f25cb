//! Conversion dispatcher module.
//!
//! Turns staged files into encoding jobs and runs them with a bounded number
//! of encoder processes in flight. A failed job is recorded and the remaining
//! jobs carry on.

use crate::capability::Capabilities;
use crate::classify::{DynamicRange, SourceFormat};
use crate::concurrency::ConcurrencyPlan;
use crate::encode::{run_job, Codec, EncodeError, EncodingJob};
use crate::run_log::RunLog;
use crate::stage::StagedFile;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use truehdr_config::Settings;

/// Final state of one encoding job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum JobOutcome {
    Succeeded,
    Failed(String),
    /// Never started, or killed, because the run was cancelled.
    Cancelled,
}

impl JobOutcome {
    pub fn as_str(&self) -> &str {
        match self {
            JobOutcome::Succeeded => "succeeded",
            JobOutcome::Failed(_) => "failed",
            JobOutcome::Cancelled => "cancelled",
        }
    }
}

/// A job together with its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobReport {
    pub job: EncodingJob,
    pub outcome: JobOutcome,
}

fn range_enabled(settings: &Settings, range: DynamicRange) -> bool {
    match range {
        DynamicRange::Sdr => settings.sdr_enabled,
        DynamicRange::Hdr => settings.hdr_enabled,
    }
}

/// Builds one job per (staged PNG, usable codec).
///
/// EXR files are delivered as renamed copies only. A codec is usable when it
/// is switched on in the settings, its tools were found, and it supports the
/// file's dynamic range. Ranges switched off in the settings get no jobs.
pub fn build_jobs(
    staged: &[StagedFile],
    capabilities: &Capabilities,
    settings: &Settings,
) -> Vec<EncodingJob> {
    let mut jobs = Vec::new();

    for file in staged {
        if file.format != SourceFormat::Png || !range_enabled(settings, file.range) {
            continue;
        }
        for codec in Codec::ALL {
            if !codec.enabled_in(settings)
                || !capabilities.is_enabled(codec)
                || !codec.supports(file.range)
            {
                continue;
            }
            jobs.push(EncodingJob::new(
                jobs.len(),
                file.path.clone(),
                codec,
                file.range,
                codec.quality_in(settings),
            ));
        }
    }

    jobs
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Runs encoding jobs with concurrency limiting via semaphore
pub struct Dispatcher {
    semaphore: Arc<Semaphore>,
    concurrency_plan: ConcurrencyPlan,
    capabilities: Arc<Capabilities>,
}

impl Dispatcher {
    pub fn new(plan: ConcurrencyPlan, capabilities: Capabilities) -> Self {
        let permits = plan.max_concurrent_jobs.max(1) as usize;
        Self {
            semaphore: Arc::new(Semaphore::new(permits)),
            concurrency_plan: plan,
            capabilities: Arc::new(capabilities),
        }
    }

    /// Get the number of available permits (slots for concurrent jobs)
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn concurrency_plan(&self) -> &ConcurrencyPlan {
        &self.concurrency_plan
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Runs every job and returns their reports in job order.
    ///
    /// `on_complete` is called with `(report, done, total)` as each job
    /// finishes. Once `cancel` fires, queued jobs are not started and running
    /// encoders are killed.
    pub async fn dispatch<F>(
        &self,
        jobs: Vec<EncodingJob>,
        log: Arc<RunLog>,
        cancel: &CancellationToken,
        mut on_complete: F,
    ) -> Vec<JobReport>
    where
        F: FnMut(&JobReport, usize, usize),
    {
        let total = jobs.len();
        let mut tasks = JoinSet::new();

        for job in jobs.iter().cloned() {
            tasks.spawn(execute(
                job,
                self.semaphore.clone(),
                self.capabilities.clone(),
                log.clone(),
                cancel.clone(),
            ));
        }

        let mut reports = Vec::with_capacity(total);
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => {
                    on_complete(&report, reports.len() + 1, total);
                    reports.push(report);
                }
                Err(e) => log.error(format!("Encoding task aborted: {}", e)),
            }
        }

        // A task that panicked left no report
        let reported: HashSet<usize> = reports.iter().map(|r| r.job.id).collect();
        for job in jobs {
            if !reported.contains(&job.id) {
                reports.push(JobReport {
                    job,
                    outcome: JobOutcome::Failed("encoding task aborted".to_string()),
                });
            }
        }

        reports.sort_by_key(|r| r.job.id);
        reports
    }
}

async fn acquire(semaphore: Arc<Semaphore>, cancel: &CancellationToken) -> Option<OwnedSemaphorePermit> {
    tokio::select! {
        permit = semaphore.acquire_owned() => permit.ok(),
        _ = cancel.cancelled() => None,
    }
}

async fn execute(
    job: EncodingJob,
    semaphore: Arc<Semaphore>,
    capabilities: Arc<Capabilities>,
    log: Arc<RunLog>,
    cancel: CancellationToken,
) -> JobReport {
    let Some(_permit) = acquire(semaphore, &cancel).await else {
        return JobReport {
            job,
            outcome: JobOutcome::Cancelled,
        };
    };
    if cancel.is_cancelled() {
        return JobReport {
            job,
            outcome: JobOutcome::Cancelled,
        };
    }

    let source = file_name(&job.source);
    let destination = file_name(&job.destination);
    log.info(format!(
        "Encoding {} -> {} ({}, quality {})",
        source, destination, job.codec, job.quality
    ));

    let outcome = match run_job(&job, &capabilities, &cancel).await {
        Ok(()) => {
            log.info(format!("Wrote {}", destination));
            JobOutcome::Succeeded
        }
        Err(EncodeError::Cancelled) => {
            log.warn(format!("Cancelled {} encode of {}", job.codec, source));
            JobOutcome::Cancelled
        }
        Err(e) => {
            log.error(format!("{} encode of {} failed: {}", job.codec, source, e));
            JobOutcome::Failed(e.to_string())
        }
    };

    JobReport { job, outcome }
}
