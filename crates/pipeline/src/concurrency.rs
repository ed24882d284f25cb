//! Concurrency planning module.
//!
//! Derives how many encoder processes may run at once from the CPU core count
//! and settings.

use truehdr_config::Settings;

/// Upper bound for derived job counts; every encoder is multithreaded itself.
pub const MAX_DERIVED_JOBS: u32 = 4;

/// Cores assumed to be saturated by one encoder process.
pub const CORES_PER_JOB: u32 = 8;

/// Concurrency plan derived from settings and system resources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcurrencyPlan {
    /// Total logical CPU cores available
    pub total_cores: u32,
    /// Maximum number of encoder processes in flight
    pub max_concurrent_jobs: u32,
}

impl ConcurrencyPlan {
    /// Derive a concurrency plan from settings
    ///
    /// An explicit `max_concurrent_jobs` wins; otherwise one job per
    /// [`CORES_PER_JOB`] cores, clamped to `1..=MAX_DERIVED_JOBS`.
    pub fn derive(settings: &Settings) -> Self {
        Self::for_cores(num_cpus::get() as u32, settings.max_concurrent_jobs)
    }

    /// Plan for a known core count. `requested == 0` means derive.
    pub fn for_cores(total_cores: u32, requested: u32) -> Self {
        let max_concurrent_jobs = if requested > 0 {
            requested
        } else {
            derive_max_jobs(total_cores)
        };
        Self {
            total_cores,
            max_concurrent_jobs,
        }
    }

    /// A plan that runs one job at a time.
    pub fn sequential() -> Self {
        Self {
            total_cores: 1,
            max_concurrent_jobs: 1,
        }
    }
}

fn derive_max_jobs(cores: u32) -> u32 {
    (cores / CORES_PER_JOB).clamp(1, MAX_DERIVED_JOBS)
}

/// Public function to derive a concurrency plan from settings
pub fn derive_plan(settings: &Settings) -> ConcurrencyPlan {
    ConcurrencyPlan::derive(settings)
}
