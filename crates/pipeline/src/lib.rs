//! TrueHDR batch pipeline
//!
//! Scans a folder of PNG/EXR exports, pairs HDR assets into shots, stages
//! renamed copies into `output/`, and converts them with external encoders.

pub mod capability;
pub mod classify;
pub mod concurrency;
pub mod dispatch;
pub mod encode;
pub mod pipeline;
pub mod plan;
pub mod result;
pub mod run_log;
pub mod scan;
pub mod stage;

#[cfg(all(test, unix))]
mod test_support;

pub use truehdr_config as config;
pub use truehdr_config::Settings;
pub use capability::{probe_capabilities, Capabilities, PathLocator, ToolLocator};
pub use classify::{classify_range, DynamicRange, SourceFormat};
pub use concurrency::{derive_plan, ConcurrencyPlan};
pub use dispatch::{build_jobs, Dispatcher, JobOutcome, JobReport};
pub use encode::{run_job, Codec, EncodeError, EncodingJob, ExternalCommand};
pub use pipeline::{validate_qualities, validate_settings, Pipeline, PipelineError, ProgressEvent};
pub use plan::{
    plan_renames, validate_prefix, NamingPolicy, PlanError, PlanWarning, RenamePlan,
    RenamePlanEntry, ZeroFill,
};
pub use result::{CodecTally, FailedJob, RunResult};
pub use run_log::{LogLevel, RunLog, EVENT_LOG_NAME, RENAME_LOG_NAME};
pub use scan::{scan_directory, scan_listing, ScanError, ScanListing, SourceAsset};
pub use stage::{output_dir_for, stage_files, StageError, StagedFile, OUTPUT_DIR_NAME};
