//! Classifier module for categorizing source images.
//!
//! Source files are either PNG or EXR exports. The dynamic range of a file is
//! read from the photographer's naming convention: a stem ending in `_HDR` marks
//! an HDR export. EXR files only ever carry HDR data.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Stem suffix that marks an HDR export.
pub const HDR_MARKER: &str = "_HDR";

/// Dynamic-range class of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DynamicRange {
    /// Standard dynamic range export.
    Sdr,
    /// High dynamic range export (PQ transfer).
    Hdr,
}

impl std::fmt::Display for DynamicRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DynamicRange::Sdr => write!(f, "SDR"),
            DynamicRange::Hdr => write!(f, "HDR"),
        }
    }
}

/// Container format of a source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    Png,
    Exr,
}

impl SourceFormat {
    /// Detects the format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        if ext.eq_ignore_ascii_case("png") {
            Some(SourceFormat::Png)
        } else if ext.eq_ignore_ascii_case("exr") {
            Some(SourceFormat::Exr)
        } else {
            None
        }
    }

    /// Lowercase extension used for staged and renamed files.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Png => "png",
            SourceFormat::Exr => "exr",
        }
    }
}

impl std::fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Checks whether a file stem carries the HDR marker.
///
/// Matching is case-insensitive and ignores trailing whitespace, so
/// `Sunset_HDR`, `sunset_hdr` and `Sunset_HDR ` all qualify.
pub fn has_hdr_marker(stem: &str) -> bool {
    let trimmed = stem.trim_end();
    trimmed.len() >= HDR_MARKER.len()
        && trimmed
            .get(trimmed.len() - HDR_MARKER.len()..)
            .map(|tail| tail.eq_ignore_ascii_case(HDR_MARKER))
            .unwrap_or(false)
}

/// Classifies a source file by format and stem.
pub fn classify_range(format: SourceFormat, stem: &str) -> DynamicRange {
    match format {
        SourceFormat::Exr => DynamicRange::Hdr,
        SourceFormat::Png if has_hdr_marker(stem) => DynamicRange::Hdr,
        SourceFormat::Png => DynamicRange::Sdr,
    }
}
