//! Runs the generated fetch and mux commands.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use futures::{StreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use rendition::{DownloadPlan, MuxOptions, ToolCommand, fetch_command, mkvmerge_command};
use tokio::process::Command;
use tracing::{debug, error, info, warn};

use crate::error::{CliError, Result};

/// mkvmerge exits with 1 when it finished with warnings.
const MKVMERGE_WARNING_EXIT: i32 = 1;

pub struct Downloader {
    options: MuxOptions,
    max_concurrent: usize,
    show_progress: bool,
}

impl Downloader {
    pub fn new(options: MuxOptions, max_concurrent: usize) -> Self {
        Self {
            options,
            max_concurrent: max_concurrent.max(1),
            show_progress: true,
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn options(&self) -> &MuxOptions {
        &self.options
    }

    /// Fetch every plan entry to its target file. Entries are independent,
    /// so all of them are attempted even when some fail.
    pub async fn run(&self, plan: &DownloadPlan) -> Result<()> {
        let mut dirs: Vec<PathBuf> = plan
            .iter()
            .filter_map(|e| e.target.parent().map(|p| p.to_path_buf()))
            .collect();
        dirs.dedup();
        for dir in dirs.iter().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }

        let total = plan.len();
        let pb = self.progress_bar(total as u64);
        info!(renditions = total, concurrency = self.max_concurrent, "Fetching renditions");

        let failures: Vec<CliError> = stream::iter(plan.iter())
            .map(|entry| {
                let cmd = fetch_command(entry, &self.options);
                let pb = pb.clone();
                async move {
                    pb.set_message(entry.target.display().to_string());
                    let result = execute(&cmd, false).await;
                    match &result {
                        Ok(()) => info!(rendition = %entry.rendition.id, target = %entry.target.display(), "Fetched"),
                        Err(e) => error!(rendition = %entry.rendition.id, error = %e, "Fetch failed"),
                    }
                    pb.inc(1);
                    result
                }
            })
            .buffer_unordered(self.max_concurrent)
            .filter_map(|r| async move { r.err() })
            .collect()
            .await;

        pb.finish_and_clear();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(CliError::FetchFailed {
                failed: failures.len(),
                total,
            })
        }
    }

    /// Run the mkvmerge command for `plan`.
    pub async fn mux(&self, plan: &DownloadPlan) -> Result<()> {
        let cmd = mkvmerge_command(plan, &self.options);
        info!(output = %self.options.output.display(), "Muxing");
        execute(&cmd, true).await
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        pb.enable_steady_tick(Duration::from_millis(500));
        if let Ok(style) =
            ProgressStyle::default_bar().template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
        }
        pb
    }
}

/// Spawn `cmd` and wait for it. A non-zero exit is an error, except the
/// mkvmerge warning status when `warnings_ok` is set.
pub async fn execute(cmd: &ToolCommand, warnings_ok: bool) -> Result<()> {
    debug!(command = %cmd, "Running");

    let output = Command::new(cmd.program())
        .args(cmd.get_args())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CliError::tool_not_found(cmd.program()),
            _ => CliError::Io(e),
        })?;

    if output.status.success() {
        return Ok(());
    }
    if warnings_ok && output.status.code() == Some(MKVMERGE_WARNING_EXIT) {
        warn!(command = %cmd, "Finished with warnings");
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(CliError::ToolFailed {
        tool: cmd.program().to_string(),
        status: output.status.to_string(),
        message: stderr
            .lines()
            .rev()
            .find(|l| !l.trim().is_empty())
            .unwrap_or_default()
            .trim()
            .to_string(),
    })
}
