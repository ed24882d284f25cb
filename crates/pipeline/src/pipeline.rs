//! Pipeline driver.
//!
//! Runs one batch end to end: validate, scan, plan, probe encoders, prepare
//! the output directory, stage and rename, encode, summarise. Stages run in
//! order; only the encode stage runs work concurrently.

use crate::capability::{probe_capabilities, Capabilities, PathLocator, ToolLocator};
use crate::concurrency::{derive_plan, ConcurrencyPlan};
use crate::dispatch::{build_jobs, Dispatcher, JobOutcome};
use crate::encode::Codec;
use crate::plan::{plan_renames, validate_prefix, NamingPolicy, PlanError, RenamePlan};
use crate::result::RunResult;
use crate::run_log::RunLog;
use crate::scan::{scan_listing, ScanError};
use crate::stage::{output_dir_for, prepare_output_dir, stage_files, StageError, StagedFile};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use truehdr_config::{Settings, MAX_QUALITY, MAX_START_COUNTER, MAX_ZERO_FILL_DIGITS};

/// Errors that stop a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A quality value is outside 0..=100
    #[error("Invalid {codec} quality {value}: must be between 0 and {max}", max = MAX_QUALITY)]
    InvalidQuality { codec: Codec, value: u32 },

    #[error("Invalid zero-fill width {value}: must be between 1 and {max}", max = MAX_ZERO_FILL_DIGITS)]
    InvalidZeroFillDigits { value: u32 },

    #[error("Invalid start counter {value}: must be at most {max}", max = MAX_START_COUNTER)]
    InvalidStartCounter { value: u32 },

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Stage(#[from] StageError),

    /// The run logs could not be created
    #[error("Failed to open run logs in {path}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PipelineError {
    /// The output directory holds an earlier run; retrying with overwrite may succeed.
    pub fn is_output_not_empty(&self) -> bool {
        matches!(self, PipelineError::Stage(StageError::OutputNotEmpty(_)))
    }
}

/// Progress notifications for a shell to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Scanned { assets: usize },
    Planned { shots: usize, files: usize },
    Probed { enabled: Vec<Codec>, unavailable: Vec<Codec> },
    Staged { done: usize, total: usize },
    Encoded {
        done: usize,
        total: usize,
        file: String,
        codec: Codec,
        outcome: JobOutcome,
    },
    Finished {
        succeeded: usize,
        failed: usize,
        cancelled: usize,
    },
}

/// Checks every quality value before anything is touched.
pub fn validate_qualities(settings: &Settings) -> Result<(), PipelineError> {
    for codec in Codec::ALL {
        let value = codec.quality_in(settings);
        if value > MAX_QUALITY {
            return Err(PipelineError::InvalidQuality { codec, value });
        }
    }
    Ok(())
}

/// Checks the numbering and quality settings before anything is touched.
///
/// Settings loaded from a document are already clamped; values set directly
/// (from command line flags, for instance) are checked strictly here.
pub fn validate_settings(settings: &Settings) -> Result<(), PipelineError> {
    validate_qualities(settings)?;
    if !(1..=MAX_ZERO_FILL_DIGITS).contains(&settings.zero_fill_digits) {
        return Err(PipelineError::InvalidZeroFillDigits {
            value: settings.zero_fill_digits,
        });
    }
    if settings.start_counter > MAX_START_COUNTER {
        return Err(PipelineError::InvalidStartCounter {
            value: settings.start_counter,
        });
    }
    Ok(())
}

/// One configured pipeline. Reusable across runs.
pub struct Pipeline {
    settings: Settings,
    locator: Arc<dyn ToolLocator>,
    concurrency_plan: ConcurrencyPlan,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl Pipeline {
    /// Create a pipeline that finds encoders on `PATH`
    pub fn new(settings: Settings) -> Self {
        let concurrency_plan = derive_plan(&settings);
        Self {
            settings,
            locator: Arc::new(PathLocator),
            concurrency_plan,
            progress: None,
        }
    }

    pub fn with_locator<L: ToolLocator + 'static>(mut self, locator: L) -> Self {
        self.locator = Arc::new(locator);
        self
    }

    pub fn with_concurrency(mut self, plan: ConcurrencyPlan) -> Self {
        self.concurrency_plan = plan;
        self
    }

    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn concurrency_plan(&self) -> &ConcurrencyPlan {
        &self.concurrency_plan
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            // The receiver may have gone away; the run continues regardless
            let _ = sender.send(event);
        }
    }

    /// Run the pipeline over `input_dir`
    ///
    /// Fails with [`StageError::OutputNotEmpty`] when `<input_dir>/output`
    /// already has content and `overwrite` is false. Individual encoder
    /// failures do not fail the run; they are counted in the result.
    pub async fn run(
        &self,
        input_dir: &Path,
        overwrite: bool,
        cancel: &CancellationToken,
    ) -> Result<RunResult, PipelineError> {
        let started = Instant::now();
        let Prepared {
            mut result,
            log,
            plan,
            capabilities,
        } = match self.prepare(input_dir, overwrite) {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!("Run aborted: {}", e);
                return Err(e);
            }
        };

        let staged = match self.stage(plan, &result.output_dir, &log, cancel).await {
            Ok(staged) => staged,
            Err(e) => {
                log.error(format!("Run aborted during staging: {}", e));
                return Err(e.into());
            }
        };
        result.renames = staged.iter().filter(|f| f.was_renamed()).count();
        log.info(format!(
            "Staged {} files, {} renamed",
            staged.len(),
            result.renames
        ));

        let jobs = build_jobs(&staged, &capabilities, &self.settings);
        log.info(format!(
            "Dispatching {} encoding jobs, up to {} at a time",
            jobs.len(),
            self.concurrency_plan.max_concurrent_jobs
        ));

        let dispatcher = Dispatcher::new(self.concurrency_plan.clone(), capabilities);
        let reports = dispatcher
            .dispatch(jobs, log.clone(), cancel, |report, done, total| {
                self.emit(ProgressEvent::Encoded {
                    done,
                    total,
                    file: report
                        .job
                        .destination
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                    codec: report.job.codec,
                    outcome: report.outcome.clone(),
                })
            })
            .await;
        for report in &reports {
            result.record(report);
        }

        result.cancelled = cancel.is_cancelled();
        result.elapsed_ms = started.elapsed().as_millis() as u64;
        for line in result.summary_lines() {
            log.info(line);
        }
        if let Err(e) = log.flush() {
            tracing::error!("Failed to flush run logs: {}", e);
        }

        self.emit(ProgressEvent::Finished {
            succeeded: result.jobs_succeeded(),
            failed: result.jobs_failed(),
            cancelled: result.jobs_cancelled(),
        });
        Ok(result)
    }

    /// Copies and renames on the blocking pool so large EXR copies do not
    /// stall the runtime.
    async fn stage(
        &self,
        plan: RenamePlan,
        output_dir: &Path,
        log: &Arc<RunLog>,
        cancel: &CancellationToken,
    ) -> Result<Vec<StagedFile>, StageError> {
        let output_dir = output_dir.to_path_buf();
        let log = log.clone();
        let cancel = cancel.clone();
        let progress = self.progress.clone();
        let join_dir = output_dir.clone();

        tokio::task::spawn_blocking(move || {
            stage_files(&plan, &output_dir, &log, &cancel, |done, total| {
                if let Some(sender) = &progress {
                    let _ = sender.send(ProgressEvent::Staged { done, total });
                }
            })
        })
        .await
        .unwrap_or_else(|e| {
            Err(StageError::Io {
                path: join_dir,
                source: io::Error::new(io::ErrorKind::Other, e),
            })
        })
    }

    /// Everything up to and including opening the run logs.
    ///
    /// Nothing is written to disk until the configuration, the input
    /// directory and the rename plan have all been validated.
    fn prepare(&self, input_dir: &Path, overwrite: bool) -> Result<Prepared, PipelineError> {
        validate_settings(&self.settings)?;
        let naming = NamingPolicy::from_settings(&self.settings);
        if naming.rename_enabled {
            validate_prefix(&naming.prefix, naming.counter_enabled)?;
        }

        let listing = scan_listing(input_dir)?;
        let assets = listing.assets;
        self.emit(ProgressEvent::Scanned {
            assets: assets.len(),
        });

        let plan = plan_renames(&assets, &naming)?;
        self.emit(ProgressEvent::Planned {
            shots: plan.shot_count(),
            files: plan.entries.len(),
        });

        let (requested, skipped): (Vec<Codec>, Vec<Codec>) = Codec::ALL
            .into_iter()
            .partition(|c| c.enabled_in(&self.settings));
        let capabilities = probe_capabilities(&requested, self.locator.as_ref());
        self.emit(ProgressEvent::Probed {
            enabled: capabilities.enabled.iter().copied().collect(),
            unavailable: capabilities.missing.keys().copied().collect(),
        });

        let output_dir = output_dir_for(input_dir);
        prepare_output_dir(&output_dir, overwrite)?;
        let log = RunLog::open(&output_dir).map_err(|source| PipelineError::Log {
            path: output_dir.clone(),
            source,
        })?;

        log.info(format!(
            "Run started: {} ({} PNG/EXR files, {} shots)",
            input_dir.display(),
            assets.len(),
            plan.shot_count()
        ));
        if assets.is_empty() {
            log.warn("No PNG or EXR files found");
        }
        let mut warnings: Vec<String> = listing
            .skipped_hidden
            .iter()
            .map(|path| {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                format!("Skipped hidden file {}", name)
            })
            .collect();
        warnings.extend(plan.warnings.iter().map(|w| w.to_string()));
        for warning in &warnings {
            log.warn(warning);
        }
        for (codec, missing) in &capabilities.missing {
            log.warn(format!(
                "{} disabled: {} not found on PATH",
                codec,
                missing.join(", ")
            ));
        }

        let mut result = RunResult::new(input_dir.to_path_buf(), output_dir);
        result.assets_found = assets.len();
        result.shots = plan.shot_count();
        result.warnings = warnings;
        result.skipped_codecs = skipped;
        result.unavailable_codecs = capabilities.missing.clone();
        for codec in &capabilities.enabled {
            result.codecs.entry(*codec).or_default();
        }

        Ok(Prepared {
            result,
            log: Arc::new(log),
            plan,
            capabilities,
        })
    }
}

/// State handed from preparation to staging.
struct Prepared {
    result: RunResult,
    log: Arc<RunLog>,
    plan: RenamePlan,
    capabilities: Capabilities,
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PlanWarning;
    use crate::scan::ScanError;
    use std::fs;
    use tempfile::TempDir;
    use truehdr_config::ZeroFillMode;

    fn photo_settings() -> Settings {
        let mut settings = Settings::default();
        settings.prefix = "Photo ".to_string();
        settings.zero_fill_mode = ZeroFillMode::Manual;
        settings.zero_fill_digits = 2;
        settings
    }

    #[tokio::test]
    async fn test_invalid_quality_fails_before_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.png"), "png").unwrap();
        let mut settings = Settings::default();
        settings.codec_quality.heic = 101;

        let err = Pipeline::new(settings)
            .run(temp_dir.path(), false, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::InvalidQuality { codec: Codec::Heic, value: 101 }
        ));
        assert!(!temp_dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_invalid_prefix_fails_before_touching_disk() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.png"), "png").unwrap();
        let mut settings = Settings::default();
        settings.prefix = "bad/prefix".to_string();

        let err = Pipeline::new(settings)
            .run(temp_dir.path(), false, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Plan(PlanError::InvalidPrefix { .. })));
        assert!(!temp_dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_missing_input_directory() {
        let temp_dir = TempDir::new().unwrap();
        let err = Pipeline::new(Settings::default())
            .run(&temp_dir.path().join("nope"), false, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Scan(ScanError::DirectoryNotFound(_))));
    }

    #[tokio::test]
    async fn test_out_of_range_numbering_is_a_config_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.png"), "png").unwrap();

        let mut settings = Settings::default();
        settings.zero_fill_mode = ZeroFillMode::Manual;
        settings.zero_fill_digits = 70_000;
        let err = Pipeline::new(settings)
            .run(temp_dir.path(), false, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidZeroFillDigits { value: 70_000 }));

        let mut settings = Settings::default();
        settings.start_counter = u32::MAX - 1;
        let err = Pipeline::new(settings)
            .run(temp_dir.path(), false, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidStartCounter { .. }));

        assert!(!temp_dir.path().join("output").exists());
    }

    #[test]
    fn test_validate_settings_bounds() {
        let mut settings = Settings::default();
        settings.zero_fill_digits = 9;
        settings.start_counter = MAX_START_COUNTER;
        assert!(validate_settings(&settings).is_ok());

        settings.zero_fill_digits = 0;
        assert!(matches!(
            validate_settings(&settings),
            Err(PipelineError::InvalidZeroFillDigits { value: 0 })
        ));
    }

    #[tokio::test]
    async fn test_cancel_before_staging_aborts_run() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.png"), "png").unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = Pipeline::new(Settings::default())
            .run(temp_dir.path(), false, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Stage(StageError::Cancelled)));
        let out = temp_dir.path().join("output");
        assert!(!out.join("a.png").exists());
        assert!(!out.join("Image_1.png").exists());
    }

    #[test]
    fn test_validate_qualities_accepts_bounds() {
        let mut settings = Settings::default();
        settings.codec_quality.jpeg = 0;
        settings.codec_quality.avif = 100;
        assert!(validate_qualities(&settings).is_ok());
    }

    #[test]
    fn test_progress_event_json() {
        let event = ProgressEvent::Staged { done: 1, total: 3 };
        assert_eq!(
            serde_json::to_string(&event).unwrap(),
            r#"{"event":"staged","done":1,"total":3}"#
        );
    }

    #[cfg(unix)]
    mod with_fake_tools {
        use super::*;
        use crate::run_log::{EVENT_LOG_NAME, RENAME_LOG_NAME};
        use crate::test_support::*;

        struct Shoot {
            _temp: TempDir,
            input: PathBuf,
            tools: PathBuf,
        }

        fn shoot(files: &[&str]) -> Shoot {
            let temp = TempDir::new().unwrap();
            let input = temp.path().join("shoot");
            let tools = temp.path().join("bin");
            fs::create_dir_all(&input).unwrap();
            fs::create_dir_all(&tools).unwrap();
            for name in files {
                fs::write(input.join(name), format!("data of {}", name)).unwrap();
            }
            Shoot {
                _temp: temp,
                input,
                tools,
            }
        }

        fn pipeline(shoot: &Shoot, settings: Settings) -> Pipeline {
            Pipeline::new(settings)
                .with_locator(DirLocator {
                    dir: shoot.tools.clone(),
                })
                .with_concurrency(ConcurrencyPlan::for_cores(8, 2))
        }

        #[tokio::test]
        async fn test_full_run() {
            let shoot = shoot(&["A_HDR.png", "A_HDR.exr", "B.png", "notes.txt"]);
            install_working_tools(&shoot.tools);
            let (tx, mut rx) = mpsc::unbounded_channel();

            let result = pipeline(&shoot, photo_settings())
                .with_progress(tx)
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            let out = shoot.input.join("output");
            assert_eq!(result.assets_found, 3);
            assert_eq!(result.shots, 2);
            assert_eq!(result.renames, 3);
            assert_eq!(result.jobs_total(), 7);
            assert_eq!(result.jobs_succeeded(), 7);
            assert!(!result.cancelled);

            assert_eq!(
                fs::read_to_string(out.join(RENAME_LOG_NAME)).unwrap(),
                "A_HDR.png -> Photo 01_HDR.png\nA_HDR.exr -> Photo 01_HDR.exr\nB.png -> Photo 02.png\n"
            );
            for name in [
                "Photo 01_HDR.png",
                "Photo 01_HDR.exr",
                "Photo 01_HDR.jxl",
                "Photo 01_HDR.heic",
                "Photo 01_HDR.avif",
                "Photo 02.png",
                "Photo 02.jpg",
                "Photo 02.jxl",
                "Photo 02.heic",
                "Photo 02.avif",
            ] {
                assert!(out.join(name).is_file(), "missing {}", name);
            }
            assert!(!out.join("Photo 01_HDR.jpg").exists());
            assert_eq!(
                fs::read_to_string(out.join("Photo 01_HDR.exr")).unwrap(),
                "data of A_HDR.exr"
            );
            // Inputs untouched
            assert!(shoot.input.join("A_HDR.png").is_file());

            let events = fs::read_to_string(out.join(EVENT_LOG_NAME)).unwrap();
            assert!(events.contains("[INFO] Run started"));
            assert!(events.contains("Processed 2 shots from 3 files"));

            let mut received = Vec::new();
            while let Ok(event) = rx.try_recv() {
                received.push(event);
            }
            assert_eq!(received.first(), Some(&ProgressEvent::Scanned { assets: 3 }));
            assert_eq!(
                received.last(),
                Some(&ProgressEvent::Finished {
                    succeeded: 7,
                    failed: 0,
                    cancelled: 0
                })
            );
            assert!(received.contains(&ProgressEvent::Staged { done: 3, total: 3 }));
        }

        #[tokio::test]
        async fn test_missing_tools_disable_codecs_not_the_run() {
            let shoot = shoot(&["A.png", "B.png"]);
            write_tool(&shoot.tools, "cjxl", WORKING_ENCODER);

            let result = pipeline(&shoot, Settings::default())
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(result.jobs_total(), 2);
            assert_eq!(result.codecs[&Codec::JpegXl].succeeded, 2);
            assert_eq!(result.unavailable_codecs.len(), 3);
            assert_eq!(result.renames, 2);

            let events = fs::read_to_string(shoot.input.join("output").join(EVENT_LOG_NAME)).unwrap();
            assert!(events.contains("[WARNING] HEIC disabled: heif-enc not found"));
        }

        #[tokio::test]
        async fn test_rerun_requires_overwrite_and_replaces_logs() {
            let shoot = shoot(&["A.png"]);
            install_working_tools(&shoot.tools);
            let cancel = CancellationToken::new();

            let mut settings = Settings::default();
            settings.prefix = "First_".to_string();
            pipeline(&shoot, settings).run(&shoot.input, false, &cancel).await.unwrap();

            let mut settings = Settings::default();
            settings.prefix = "Second_".to_string();
            let second = pipeline(&shoot, settings);

            let err = second.run(&shoot.input, false, &cancel).await.unwrap_err();
            assert!(err.is_output_not_empty());
            let out = shoot.input.join("output");
            assert!(out.join("First_1.png").exists());

            second.run(&shoot.input, true, &cancel).await.unwrap();
            assert_eq!(
                fs::read_to_string(out.join(RENAME_LOG_NAME)).unwrap(),
                "A.png -> Second_1.png\n"
            );
            assert!(!out.join("First_1.png").exists());
            assert!(!out.join("First_1.jpg").exists());
        }

        #[tokio::test]
        async fn test_failures_are_counted_not_fatal() {
            let shoot = shoot(&["A_HDR.png", "B.png"]);
            install_working_tools(&shoot.tools);
            write_tool(&shoot.tools, "avifenc", FAILING_ENCODER);

            let result = pipeline(&shoot, Settings::default())
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(result.codecs[&Codec::Avif].failed, 2);
            assert_eq!(result.jobs_succeeded(), 5);
            assert_eq!(result.failures.len(), 2);
        }

        #[tokio::test]
        async fn test_unpaired_exr_is_renamed_and_warned() {
            let shoot = shoot(&["Lone_HDR.exr"]);
            install_working_tools(&shoot.tools);

            let result = pipeline(&shoot, Settings::default())
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(result.shots, 1);
            assert_eq!(result.jobs_total(), 0);
            assert_eq!(
                result.warnings,
                vec![PlanWarning::UnpairedExr {
                    file: "Lone_HDR.exr".to_string()
                }
                .to_string()]
            );
            assert!(shoot.input.join("output").join("Image_1_HDR.exr").is_file());
        }

        #[tokio::test]
        async fn test_rename_disabled_keeps_original_names() {
            let shoot = shoot(&["Sunset_HDR.png", "Sunset_HDR.exr", "Beach.png"]);
            install_working_tools(&shoot.tools);
            let mut settings = Settings::default();
            settings.rename_enabled = false;

            let result = pipeline(&shoot, settings)
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            let out = shoot.input.join("output");
            assert_eq!(result.renames, 0);
            assert_eq!(result.shots, 2);
            assert_eq!(result.jobs_succeeded(), 7);
            assert_eq!(fs::read_to_string(out.join(RENAME_LOG_NAME)).unwrap(), "");
            for name in ["Sunset_HDR.png", "Sunset_HDR.exr", "Sunset_HDR.avif", "Beach.png", "Beach.jpg"] {
                assert!(out.join(name).is_file(), "missing {}", name);
            }
        }

        #[tokio::test]
        async fn test_hidden_sources_are_warned_about() {
            let shoot = shoot(&["A.png", "._A.png"]);
            install_working_tools(&shoot.tools);

            let result = pipeline(&shoot, Settings::default())
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(result.assets_found, 1);
            assert_eq!(result.warnings, vec!["Skipped hidden file ._A.png".to_string()]);
            let events = fs::read_to_string(shoot.input.join("output").join(EVENT_LOG_NAME)).unwrap();
            assert!(events.contains("[WARNING] Skipped hidden file ._A.png"));
        }

        #[tokio::test]
        async fn test_range_toggle_skips_encoding_but_still_renames() {
            let shoot = shoot(&["A_HDR.png", "B.png"]);
            install_working_tools(&shoot.tools);
            let mut settings = Settings::default();
            settings.sdr_enabled = false;
            settings.codec_enabled.jpeg = false;

            let result = pipeline(&shoot, settings)
                .run(&shoot.input, false, &CancellationToken::new())
                .await
                .unwrap();

            assert_eq!(result.renames, 2);
            assert_eq!(result.jobs_total(), 3);
            assert_eq!(result.skipped_codecs, vec![Codec::Jpeg]);
            assert!(!shoot.input.join("output").join("Image_2.jxl").exists());
        }
    }
}
