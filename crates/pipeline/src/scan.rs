//! Scanner module for discovering source images in a working directory.
//!
//! Only the immediate children of the directory are considered. Files are
//! returned in a stable listing order: by lowercase stem, with a PNG sorted
//! ahead of the EXR of the same name, so an HDR PNG is always discovered just
//! before its EXR companion.

use crate::classify::{classify_range, DynamicRange, SourceFormat};
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

/// Errors that can occur while scanning the working directory.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The path does not exist or is not a directory.
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    /// The directory could not be listed.
    #[error("Failed to list directory: {0}")]
    Io(#[from] walkdir::Error),
}

/// A source image discovered during scanning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceAsset {
    /// Absolute path to the file in the working directory.
    pub path: PathBuf,
    pub format: SourceFormat,
    pub range: DynamicRange,
    /// Position in discovery order, starting at 0.
    pub index: usize,
}

impl SourceAsset {
    /// File name including extension, as found on disk.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name without extension.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_hdr(&self) -> bool {
        self.range == DynamicRange::Hdr
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(true)
}

/// Checks if a path names a PNG or EXR file and is not hidden.
pub fn is_source_file(path: &Path) -> bool {
    !is_hidden(path) && SourceFormat::from_path(path).is_some()
}

fn listing_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    listing_key(a.path()).cmp(&listing_key(b.path()))
}

fn listing_key(path: &Path) -> (String, u8, String) {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let rank = match SourceFormat::from_path(path) {
        Some(SourceFormat::Png) => 0,
        Some(SourceFormat::Exr) => 1,
        None => 2,
    };
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    (stem, rank, name)
}

/// Result of listing a working directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanListing {
    pub assets: Vec<SourceAsset>,
    /// Hidden `.png`/`.exr` files that were left out, such as `._IMG.png`
    /// resource forks.
    pub skipped_hidden: Vec<PathBuf>,
}

/// Lists a working directory for PNG and EXR files.
///
/// This function:
/// - Lists only the immediate children of `root` (no recursion)
/// - Keeps regular files with a `.png` or `.exr` extension (case-insensitive)
/// - Reports hidden files such as `._IMG.png` resource forks separately
/// - Tags each file SDR or HDR from its name
///
/// An empty directory produces an empty listing, not an error.
pub fn scan_listing(root: &Path) -> Result<ScanListing, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::DirectoryNotFound(root.to_path_buf()));
    }

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by(listing_order);

    let mut listing = ScanListing::default();

    for entry in walker {
        let entry = entry?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(format) = SourceFormat::from_path(path) else {
            continue;
        };
        if is_hidden(path) {
            tracing::warn!("Skipping hidden file {}", path.display());
            listing.skipped_hidden.push(path.to_path_buf());
            continue;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        listing.assets.push(SourceAsset {
            path: path.to_path_buf(),
            format,
            range: classify_range(format, &stem),
            index: listing.assets.len(),
        });
    }

    Ok(listing)
}

/// Scans a working directory for PNG and EXR files.
///
/// Same as [`scan_listing`] without the skipped-file report.
pub fn scan_directory(root: &Path) -> Result<Vec<SourceAsset>, ScanError> {
    scan_listing(root).map(|listing| listing.assets)
}
