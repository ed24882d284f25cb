//! CLI entry point for the TrueHDR converter
//!
//! Loads the settings document, applies command line overrides, and runs the
//! pipeline over one input directory.

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use truehdr::config::{ZeroFillMode, MAX_START_COUNTER, MAX_ZERO_FILL_DIGITS};
use truehdr::{JobOutcome, Pipeline, PipelineError, ProgressEvent, RunResult, Settings};

/// TrueHDR converter - rename and convert PNG/EXR exports
#[derive(Parser, Debug)]
#[command(name = "truehdr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Directory holding the PNG/EXR files (defaults to the last one used)
    input_dir: Option<PathBuf>,

    /// Settings document (TOML, or JSON when the name ends in .json)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Keep the original file names; only name clashes are changed
    #[arg(long)]
    no_rename: bool,

    /// Text placed before each shot number
    #[arg(short, long)]
    prefix: Option<String>,

    /// Number given to the first shot
    #[arg(long, value_parser = clap::value_parser!(u32).range(..=MAX_START_COUNTER as i64))]
    start_counter: Option<u32>,

    /// Pad shot numbers to a fixed number of digits (1-9)
    #[arg(
        long,
        value_name = "DIGITS",
        conflicts_with = "no_zero_fill",
        value_parser = clap::value_parser!(u32).range(1..=MAX_ZERO_FILL_DIGITS as i64)
    )]
    zero_fill: Option<u32>,

    /// Do not pad shot numbers
    #[arg(long)]
    no_zero_fill: bool,

    /// Leave shot numbers out of the output names
    #[arg(long)]
    no_counter: bool,

    /// JPEG quality (0-100)
    #[arg(long, value_name = "Q")]
    jpeg_quality: Option<u32>,

    /// JPEG XL quality (0-100)
    #[arg(long, value_name = "Q")]
    jxl_quality: Option<u32>,

    /// HEIC quality (0-100)
    #[arg(long, value_name = "Q")]
    heic_quality: Option<u32>,

    /// AVIF quality (0-100)
    #[arg(long, value_name = "Q")]
    avif_quality: Option<u32>,

    #[arg(long)]
    no_jpeg: bool,

    #[arg(long)]
    no_jxl: bool,

    #[arg(long)]
    no_heic: bool,

    #[arg(long)]
    no_avif: bool,

    /// Skip encoding SDR shots
    #[arg(long)]
    no_sdr: bool,

    /// Skip encoding HDR shots
    #[arg(long)]
    no_hdr: bool,

    /// Encoder processes to run at once (0 = derive from CPU cores)
    #[arg(short, long)]
    jobs: Option<u32>,

    /// Replace an existing output directory without asking
    #[arg(short, long)]
    yes: bool,

    /// Write the effective settings back to the settings document
    #[arg(long)]
    save_settings: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

impl Args {
    fn apply_to(&self, settings: &mut Settings) {
        if self.no_rename {
            settings.rename_enabled = false;
        }
        if let Some(prefix) = &self.prefix {
            settings.prefix = prefix.clone();
        }
        if let Some(start) = self.start_counter {
            settings.start_counter = start;
        }
        if let Some(digits) = self.zero_fill {
            settings.zero_fill_enabled = true;
            settings.zero_fill_mode = ZeroFillMode::Manual;
            settings.zero_fill_digits = digits;
        }
        if self.no_zero_fill {
            settings.zero_fill_enabled = false;
        }
        if self.no_counter {
            settings.counter_enabled = false;
        }

        let qualities = &mut settings.codec_quality;
        for (flag, target) in [
            (self.jpeg_quality, &mut qualities.jpeg),
            (self.jxl_quality, &mut qualities.jpegxl),
            (self.heic_quality, &mut qualities.heic),
            (self.avif_quality, &mut qualities.avif),
        ] {
            if let Some(quality) = flag {
                *target = quality;
            }
        }

        let toggles = &mut settings.codec_enabled;
        toggles.jpeg &= !self.no_jpeg;
        toggles.jpegxl &= !self.no_jxl;
        toggles.heic &= !self.no_heic;
        toggles.avif &= !self.no_avif;
        settings.sdr_enabled &= !self.no_sdr;
        settings.hdr_enabled &= !self.no_hdr;

        if let Some(jobs) = self.jobs {
            settings.max_concurrent_jobs = jobs;
        }
    }
}

fn load_settings(path: Option<&Path>) -> Settings {
    match path {
        Some(path) => Settings::load_or_default(path),
        None => {
            tracing::warn!("No configuration directory found; using default settings");
            Settings::default()
        }
    }
}

fn render(event: &ProgressEvent) {
    match event {
        ProgressEvent::Scanned { assets } => tracing::info!("Found {} PNG/EXR files", assets),
        ProgressEvent::Planned { shots, files } => {
            tracing::info!("Planned {} shots across {} files", shots, files)
        }
        ProgressEvent::Probed {
            enabled,
            unavailable,
        } => {
            let names: Vec<String> = enabled.iter().map(|c| c.to_string()).collect();
            tracing::info!("Encoders available: {}", names.join(", "));
            if !unavailable.is_empty() {
                let names: Vec<String> = unavailable.iter().map(|c| c.to_string()).collect();
                tracing::warn!("Encoders unavailable: {}", names.join(", "));
            }
        }
        ProgressEvent::Staged { done, total } => {
            tracing::debug!("Staged {}/{}", done, total)
        }
        ProgressEvent::Encoded {
            done,
            total,
            file,
            codec,
            outcome,
        } => match outcome {
            JobOutcome::Succeeded => tracing::info!("[{}/{}] {} ({})", done, total, file, codec),
            JobOutcome::Failed(error) => {
                tracing::warn!("[{}/{}] {} ({}) failed: {}", done, total, file, codec, error)
            }
            JobOutcome::Cancelled => {
                tracing::warn!("[{}/{}] {} ({}) cancelled", done, total, file, codec)
            }
        },
        ProgressEvent::Finished { .. } => {}
    }
}

/// Asks on stdin whether an existing output directory may be replaced.
fn confirm_overwrite(output_dir: &Path) -> bool {
    print!(
        "{} already contains files from an earlier run. Replace them? [y/N] ",
        output_dir.display()
    );
    if io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"),
        Err(_) => false,
    }
}

async fn run_with_confirmation(
    pipeline: &Pipeline,
    input_dir: &Path,
    assume_yes: bool,
    cancel: &CancellationToken,
) -> Result<Option<RunResult>, PipelineError> {
    match pipeline.run(input_dir, false, cancel).await {
        Err(e) if e.is_output_not_empty() => {
            let output_dir = truehdr::output_dir_for(input_dir);
            let confirmed = assume_yes
                || tokio::task::spawn_blocking(move || confirm_overwrite(&output_dir))
                    .await
                    .unwrap_or(false);
            if !confirmed {
                return Ok(None);
            }
            pipeline.run(input_dir, true, cancel).await.map(Some)
        }
        other => other.map(Some),
    }
}

fn print_result(result: &RunResult, json: bool) -> bool {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Failed to serialize run result: {}", e);
                return false;
            }
        }
    } else {
        print!("{}", result);
        for failure in &result.failures {
            println!("  {} ({}): {}", failure.source, failure.codec, failure.error);
        }
    }
    true
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let settings_path = args.settings.clone().or_else(Settings::default_path);
    let mut settings = load_settings(settings_path.as_deref());
    args.apply_to(&mut settings);

    let Some(input_dir) = args.input_dir.clone().or_else(|| settings.last_input_dir.clone()) else {
        eprintln!("No input directory given and none remembered from a previous run");
        return ExitCode::from(2);
    };
    settings.last_input_dir = Some(input_dir.clone());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping encoders");
            ctrl_c.cancel();
        }
    });

    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();
    let renderer = tokio::spawn(async move {
        while let Some(event) = progress_rx.recv().await {
            render(&event);
        }
    });

    let pipeline = Pipeline::new(settings.clone()).with_progress(progress_tx);
    tracing::info!(
        "Processing {} with up to {} encoder processes",
        input_dir.display(),
        pipeline.concurrency_plan().max_concurrent_jobs
    );
    let outcome = run_with_confirmation(&pipeline, &input_dir, args.yes, &cancel).await;
    drop(pipeline);
    let _ = renderer.await;

    let result = match outcome {
        Ok(Some(result)) => result,
        Ok(None) => {
            eprintln!("Output directory left untouched");
            return ExitCode::FAILURE;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if args.save_settings {
        match &settings_path {
            Some(path) => match settings.save(path) {
                Ok(()) => tracing::info!("Saved settings to {}", path.display()),
                Err(e) => tracing::error!("Failed to save settings: {}", e),
            },
            None => tracing::error!("No settings location available; use --settings"),
        }
    }

    if !print_result(&result, args.json) {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
