//! Location of the external tools the download step runs.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{CliError, Result};

pub const FFMPEG: &str = "ffmpeg";
pub const MKVMERGE: &str = "mkvmerge";

/// Resolve `name` to an executable path.
///
/// A configured path is used when it exists; otherwise the tool is looked
/// up on `PATH`.
pub fn locate(name: &str, configured: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = configured {
        if path.exists() {
            debug!(tool = name, path = %path.display(), "Using configured tool path");
            return Ok(path.to_path_buf());
        }
        warn!(tool = name, path = %path.display(), "Configured tool path does not exist, searching PATH");
    }

    which::which(name)
        .inspect(|path| debug!(tool = name, path = %path.display(), "Found tool on PATH"))
        .map_err(|_| CliError::tool_not_found(name))
}
