//! Capability probe module.
//!
//! Resolves the external encoder binaries once per run and decides which
//! codecs can be used. A codec whose tools are missing is disabled up front
//! rather than failing each of its jobs.

use crate::encode::Codec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

/// Finds external programs.
pub trait ToolLocator: Send + Sync {
    /// Returns the absolute path of `program`, if it can be found.
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// Searches the `PATH` environment variable.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// Outcome of probing for encoder tools.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Requested codecs whose tools were all found.
    pub enabled: BTreeSet<Codec>,
    /// Requested codecs that were disabled, with the tools that are missing.
    pub missing: BTreeMap<Codec, Vec<String>>,
    /// Resolved tool paths by program name.
    pub tools: BTreeMap<String, PathBuf>,
}

impl Capabilities {
    pub fn is_enabled(&self, codec: Codec) -> bool {
        self.enabled.contains(&codec)
    }

    /// Resolved path of a tool, or the bare name when it was never probed.
    pub fn tool_path(&self, program: &str) -> PathBuf {
        self.tools
            .get(program)
            .cloned()
            .unwrap_or_else(|| PathBuf::from(program))
    }
}

/// Probes the tools of every requested codec.
///
/// Each program is looked up at most once even when several codecs share it.
pub fn probe_capabilities(requested: &[Codec], locator: &dyn ToolLocator) -> Capabilities {
    let mut capabilities = Capabilities::default();
    let mut not_found: BTreeSet<&str> = BTreeSet::new();

    for &codec in requested {
        let mut missing = Vec::new();
        for &program in codec.required_tools() {
            if capabilities.tools.contains_key(program) {
                continue;
            }
            if not_found.contains(program) {
                missing.push(program.to_string());
                continue;
            }
            match locator.locate(program) {
                Some(path) => {
                    tracing::debug!("Found {} at {}", program, path.display());
                    capabilities.tools.insert(program.to_string(), path);
                }
                None => {
                    not_found.insert(program);
                    missing.push(program.to_string());
                }
            }
        }

        if missing.is_empty() {
            capabilities.enabled.insert(codec);
        } else {
            tracing::debug!("{} unavailable: missing {}", codec, missing.join(", "));
            capabilities.missing.insert(codec, missing);
        }
    }

    capabilities
}
