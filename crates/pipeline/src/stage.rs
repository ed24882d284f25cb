//! Stager module for copying sources into the output area and renaming them.
//!
//! The input directory is never modified. Every source is first copied into
//! `output/` under its original name, then each copy is moved aside to a
//! private staging name, and finally moved to its planned name. Moving every
//! copy aside before any final move means an original name that equals some
//! other file's planned name can never be clobbered.

use crate::classify::{DynamicRange, SourceFormat};
use crate::plan::RenamePlan;
use crate::run_log::RunLog;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Name of the output directory created inside the input directory.
pub const OUTPUT_DIR_NAME: &str = "output";

/// Errors that can occur while staging files.
#[derive(Debug, Error)]
pub enum StageError {
    /// The output directory holds files from an earlier run.
    #[error("Output directory {0} is not empty")]
    OutputNotEmpty(PathBuf),

    /// The output directory could not be created, listed or cleared.
    #[error("Output directory {path} is not accessible: {source}")]
    OutputInaccessible {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The run was cancelled while files were being copied; the partial
    /// copies have been removed.
    #[error("Staging cancelled")]
    Cancelled,

    /// Copying or renaming a file failed.
    #[error("Failed to stage {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A source copied into the output area under its planned name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFile {
    /// File name in the input directory.
    pub original_name: String,
    /// Final path inside the output directory.
    pub path: PathBuf,
    pub basename: String,
    pub format: SourceFormat,
    pub range: DynamicRange,
    /// Index of the shot this file belongs to.
    pub group: usize,
}

impl StagedFile {
    /// Whether the file ended up under a different name.
    pub fn was_renamed(&self) -> bool {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy() != self.original_name.as_str())
            .unwrap_or(true)
    }
}

/// Returns `<input>/output`.
pub fn output_dir_for(input_dir: &Path) -> PathBuf {
    input_dir.join(OUTPUT_DIR_NAME)
}

/// Creates the output directory, or checks that it can be reused.
///
/// An existing directory with any entries is rejected with
/// [`StageError::OutputNotEmpty`] unless `overwrite` is set, in which case
/// its contents are removed first.
pub fn prepare_output_dir(dir: &Path, overwrite: bool) -> Result<(), StageError> {
    let inaccessible = |source| StageError::OutputInaccessible {
        path: dir.to_path_buf(),
        source,
    };

    if dir.exists() && !dir.is_dir() {
        return Err(inaccessible(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "a file with this name exists",
        )));
    }
    fs::create_dir_all(dir).map_err(inaccessible)?;

    let entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(inaccessible)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<_, _>>()
        .map_err(inaccessible)?;

    if entries.is_empty() {
        return Ok(());
    }
    if !overwrite {
        return Err(StageError::OutputNotEmpty(dir.to_path_buf()));
    }

    tracing::info!(
        "Clearing {} entries from {}",
        entries.len(),
        dir.display()
    );
    for path in entries {
        let removed = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        removed.map_err(inaccessible)?;
    }
    Ok(())
}

fn staging_name(position: usize, format: SourceFormat) -> String {
    format!(".truehdr-staging-{:06}.{}", position, format.extension())
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> StageError + '_ {
    move |source| StageError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Copies every planned source into `output_dir` and renames it.
///
/// `output_dir` must already be prepared. Each completed rename is written to
/// the rename log before the next one starts; a file whose planned name equals
/// its original name is not logged. `on_progress` is called with
/// `(done, total)` after each file. Any I/O failure aborts staging; renames
/// logged so far remain valid.
///
/// `cancel` is checked between copies. Once every copy exists the remaining
/// steps are renames within one directory and run to completion.
pub fn stage_files<F>(
    plan: &RenamePlan,
    output_dir: &Path,
    log: &RunLog,
    cancel: &CancellationToken,
    mut on_progress: F,
) -> Result<Vec<StagedFile>, StageError>
where
    F: FnMut(usize, usize),
{
    let total = plan.entries.len();

    // Copy under the original names
    let mut copies = Vec::with_capacity(total);
    for entry in &plan.entries {
        if cancel.is_cancelled() {
            for (_, copy_path) in &copies {
                let _ = fs::remove_file(copy_path);
            }
            return Err(StageError::Cancelled);
        }
        let original_name = entry.source.file_name();
        let copy_path = output_dir.join(&original_name);
        fs::copy(&entry.source.path, &copy_path).map_err(io_error(&entry.source.path))?;
        copies.push((original_name, copy_path));
    }

    // Move every copy aside
    let mut staged_paths = Vec::with_capacity(total);
    for (position, (entry, (_, copy_path))) in plan.entries.iter().zip(&copies).enumerate() {
        let staged = output_dir.join(staging_name(position, entry.source.format));
        fs::rename(copy_path, &staged).map_err(io_error(copy_path))?;
        staged_paths.push(staged);
    }

    // Move each into its planned name and record it immediately
    let mut staged_files = Vec::with_capacity(total);
    for (done, ((entry, (original_name, _)), staged)) in plan
        .entries
        .iter()
        .zip(copies)
        .zip(staged_paths)
        .enumerate()
    {
        let new_name = entry.destination_name();
        let final_path = output_dir.join(&new_name);
        fs::rename(&staged, &final_path).map_err(io_error(&staged))?;
        if original_name != new_name {
            log.rename(&original_name, &new_name)
                .map_err(io_error(log.rename_log_path()))?;
        }

        staged_files.push(StagedFile {
            original_name,
            path: final_path,
            basename: entry.basename.clone(),
            format: entry.source.format,
            range: entry.source.range,
            group: entry.group,
        });
        on_progress(done + 1, total);
    }

    Ok(staged_files)
}
