//! Encoding modules.
//!
//! Every target codec is driven by external encoder binaries. A codec's
//! argument recipe lives in [`profile`]; this module defines the job type and
//! runs the resulting commands.

pub mod profile;

pub use profile::{build_commands, profile_for, Arg, Profile, Step};

use crate::capability::Capabilities;
use crate::classify::DynamicRange;
use serde::Serialize;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use truehdr_config::Settings;

/// Delivery codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    Jpeg,
    JpegXl,
    Heic,
    Avif,
}

impl Codec {
    pub const ALL: [Codec; 4] = [Codec::Jpeg, Codec::JpegXl, Codec::Heic, Codec::Avif];

    /// Key used in the settings document.
    pub fn key(&self) -> &'static str {
        match self {
            Codec::Jpeg => "jpeg",
            Codec::JpegXl => "jpegxl",
            Codec::Heic => "heic",
            Codec::Avif => "avif",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Codec::Jpeg => "jpg",
            Codec::JpegXl => "jxl",
            Codec::Heic => "heic",
            Codec::Avif => "avif",
        }
    }

    /// External programs the codec needs, in invocation order.
    pub fn required_tools(&self) -> &'static [&'static str] {
        match self {
            Codec::Jpeg => &[profile::FFMPEG, profile::CJPEG],
            Codec::JpegXl => &[profile::CJXL],
            Codec::Heic => &[profile::HEIF_ENC],
            Codec::Avif => &[profile::AVIFENC],
        }
    }

    /// JPEG cannot carry HDR data; every other codec takes both ranges.
    pub fn supports(&self, range: DynamicRange) -> bool {
        !(*self == Codec::Jpeg && range == DynamicRange::Hdr)
    }

    pub fn enabled_in(&self, settings: &Settings) -> bool {
        let toggles = &settings.codec_enabled;
        match self {
            Codec::Jpeg => toggles.jpeg,
            Codec::JpegXl => toggles.jpegxl,
            Codec::Heic => toggles.heic,
            Codec::Avif => toggles.avif,
        }
    }

    pub fn quality_in(&self, settings: &Settings) -> u32 {
        let qualities = &settings.codec_quality;
        match self {
            Codec::Jpeg => qualities.jpeg,
            Codec::JpegXl => qualities.jpegxl,
            Codec::Heic => qualities.heic,
            Codec::Avif => qualities.avif,
        }
    }
}

impl std::fmt::Display for Codec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Codec::Jpeg => "JPEG",
            Codec::JpegXl => "JPEG XL",
            Codec::Heic => "HEIC",
            Codec::Avif => "AVIF",
        };
        f.write_str(label)
    }
}

/// Error type for encoding operations
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder could not be started
    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The encoder exited with non-zero status
    #[error("{program} failed with exit code {code}: {stderr}")]
    Failed {
        program: String,
        code: i32,
        stderr: String,
    },

    /// The encoder was terminated by a signal
    #[error("{program} was terminated by a signal")]
    Terminated { program: String },

    /// The encoder reported success but wrote nothing
    #[error("No output written to {0}")]
    MissingOutput(PathBuf),

    /// No recipe exists for this codec and range
    #[error("{codec} cannot encode {range} sources")]
    Unsupported { codec: Codec, range: DynamicRange },

    #[error("Cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// One (asset, codec) encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodingJob {
    pub id: usize,
    /// Renamed PNG in the output directory.
    pub source: PathBuf,
    pub codec: Codec,
    pub range: DynamicRange,
    pub quality: u32,
    pub destination: PathBuf,
}

impl EncodingJob {
    /// Destination is the source path with the codec's extension.
    pub fn new(id: usize, source: PathBuf, codec: Codec, range: DynamicRange, quality: u32) -> Self {
        let destination = source.with_extension(codec.extension());
        Self {
            id,
            source,
            codec,
            range,
            quality,
            destination,
        }
    }

    fn sibling(&self, suffix: &str) -> PathBuf {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.source.with_file_name(format!("{}.partial.{}", stem, suffix))
    }

    /// Temporary file the encoder writes to: `<stem>.partial.<ext>`.
    pub fn partial_path(&self) -> PathBuf {
        self.sibling(self.codec.extension())
    }

    /// Intermediate file for multi-step recipes.
    pub fn intermediate_path(&self) -> PathBuf {
        self.sibling("bmp")
    }
}

/// An external program invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
}

impl ExternalCommand {
    /// Program file name, for messages.
    pub fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }

    /// Builds a process that is killed if its handle is dropped.
    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Runs the command to completion, or until `cancel` fires.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<(), EncodeError> {
        let program = self.program_name();
        tracing::debug!("Running {} {:?}", self.program.display(), self.args);

        let child = self
            .to_command()
            .spawn()
            .map_err(|source| EncodeError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => return Err(EncodeError::Cancelled),
        };

        if output.status.success() {
            return Ok(());
        }
        match output.status.code() {
            Some(code) => Err(EncodeError::Failed {
                program,
                code,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }),
            None => Err(EncodeError::Terminated { program }),
        }
    }
}

async fn remove_quietly(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

/// Moves a finished temporary output into place.
///
/// Success needs a non-empty temporary file.
async fn finalize(partial: &Path, destination: &Path) -> Result<(), EncodeError> {
    match tokio::fs::metadata(partial).await {
        Ok(meta) if meta.len() > 0 => {}
        _ => return Err(EncodeError::MissingOutput(partial.to_path_buf())),
    }
    tokio::fs::rename(partial, destination).await?;
    Ok(())
}

/// Runs every step of a job and moves the result to its destination.
///
/// Temporary and intermediate files are removed on every exit path, so a
/// failed or cancelled job never leaves a final-named file behind.
pub async fn run_job(
    job: &EncodingJob,
    capabilities: &Capabilities,
    cancel: &CancellationToken,
) -> Result<(), EncodeError> {
    let unsupported = EncodeError::Unsupported {
        codec: job.codec,
        range: job.range,
    };
    let profile = profile_for(job.codec, job.range).ok_or(unsupported)?;
    let commands = build_commands(job, capabilities).unwrap_or_default();

    let partial = job.partial_path();
    let intermediate = job.intermediate_path();
    remove_quietly(&partial).await;

    let mut result = Ok(());
    for command in &commands {
        if cancel.is_cancelled() {
            result = Err(EncodeError::Cancelled);
            break;
        }
        result = command.run(cancel).await;
        if result.is_err() {
            break;
        }
    }
    if result.is_ok() {
        result = finalize(&partial, &job.destination).await;
    }

    if profile.uses_intermediate() {
        remove_quietly(&intermediate).await;
    }
    if result.is_err() {
        remove_quietly(&partial).await;
    }
    result
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_keys_and_extensions() {
        let keys: Vec<&str> = Codec::ALL.iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["jpeg", "jpegxl", "heic", "avif"]);
        let exts: Vec<&str> = Codec::ALL.iter().map(|c| c.extension()).collect();
        assert_eq!(exts, vec!["jpg", "jxl", "heic", "avif"]);
        assert_eq!(Codec::JpegXl.to_string(), "JPEG XL");
        assert_eq!(serde_json::to_string(&Codec::JpegXl).unwrap(), "\"jpegxl\"");
    }

    #[test]
    fn test_jpeg_is_sdr_only() {
        assert!(Codec::Jpeg.supports(DynamicRange::Sdr));
        assert!(!Codec::Jpeg.supports(DynamicRange::Hdr));
        for codec in [Codec::JpegXl, Codec::Heic, Codec::Avif] {
            assert!(codec.supports(DynamicRange::Sdr));
            assert!(codec.supports(DynamicRange::Hdr));
        }
    }

    #[test]
    fn test_codec_reads_settings() {
        let mut settings = Settings::default();
        settings.codec_enabled.heic = false;
        settings.codec_quality.avif = 42;
        assert!(!Codec::Heic.enabled_in(&settings));
        assert!(Codec::Avif.enabled_in(&settings));
        assert_eq!(Codec::Avif.quality_in(&settings), 42);
        assert_eq!(Codec::Jpeg.quality_in(&settings), 95);
    }

    #[test]
    fn test_job_paths() {
        let job = EncodingJob::new(
            0,
            PathBuf::from("/shoot/output/Photo 01_HDR.png"),
            Codec::Avif,
            DynamicRange::Hdr,
            99,
        );
        assert_eq!(job.destination, PathBuf::from("/shoot/output/Photo 01_HDR.avif"));
        assert_eq!(
            job.partial_path(),
            PathBuf::from("/shoot/output/Photo 01_HDR.partial.avif")
        );
        assert_eq!(
            job.intermediate_path(),
            PathBuf::from("/shoot/output/Photo 01_HDR.partial.bmp")
        );
    }

    #[test]
    fn test_program_name() {
        let cmd = ExternalCommand {
            program: PathBuf::from("/usr/local/bin/cjxl"),
            args: vec![],
        };
        assert_eq!(cmd.program_name(), "cjxl");
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let cmd = ExternalCommand {
            program: PathBuf::from("/nonexistent/definitely-not-an-encoder"),
            args: vec![],
        };
        let err = cmd.run(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, EncodeError::Spawn { .. }));
    }
}
