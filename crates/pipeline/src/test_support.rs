//! Fake encoder tools for tests.

use crate::capability::ToolLocator;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Finds tools in a single directory.
pub struct DirLocator {
    pub dir: PathBuf,
}

impl ToolLocator for DirLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        let path = self.dir.join(program);
        path.is_file().then_some(path)
    }
}

/// Writes the output file every recipe names: the value after `--output` or
/// `-outfile`, the second argument for cjxl, or the last argument otherwise.
pub const WORKING_ENCODER: &str = r#"out=""
prev=""
for arg; do
  case "$prev" in --output|-outfile) out="$arg";; esac
  prev="$arg"
done
if [ -z "$out" ]; then
  case "$(basename "$0")" in cjxl) out="$2";; *) out="$prev";; esac
fi
printf encoded > "$out""#;

pub const FAILING_ENCODER: &str = "echo 'unsupported input' >&2\nexit 3";

pub const SILENT_ENCODER: &str = "exit 0";

pub const SLOW_ENCODER: &str = "exec sleep 30";

/// Creates an executable shell script named `name` in `dir`.
pub fn write_tool(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Installs working versions of every encoder tool.
pub fn install_working_tools(dir: &Path) {
    for name in ["ffmpeg", "cjpeg", "cjxl", "heif-enc", "avifenc"] {
        write_tool(dir, name, WORKING_ENCODER);
    }
}
