//! Export primitive seam.
//!
//! The exporter renders a frame range into a file. It offers no completion
//! signal: `export` returns once the export has been *started*, and the
//! only observable progress is the output file appearing and growing.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use framebatch_common::error::{FrameBatchError, FrameBatchResult};

/// One export invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportJob {
    /// Destination file.
    pub output_path: PathBuf,

    /// First frame (inclusive).
    pub frame_start: i64,

    /// Last frame (inclusive).
    pub frame_end: i64,
}

impl ExportJob {
    pub fn new(output_path: impl Into<PathBuf>, frame_start: i64, frame_end: i64) -> Self {
        Self {
            output_path: output_path.into(),
            frame_start,
            frame_end,
        }
    }

    /// File name component of the output path.
    pub fn filename(&self) -> String {
        self.output_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Trait for export backends.
pub trait ExportBackend: Send {
    /// Start exporting `job`. Must not wait for the export to finish.
    fn export(&mut self, job: &ExportJob) -> FrameBatchResult<()>;

    /// Check if this backend can run on the system.
    fn is_available(&self) -> bool;

    /// Backend name.
    fn name(&self) -> &str;
}

/// Backend that launches an external command per export.
///
/// The command is an argv template; `{output}`, `{filename}`, `{start}` and
/// `{end}` are substituted in every argument. Spawned processes are reaped
/// opportunistically on later calls and when the backend is dropped.
pub struct CommandBackend {
    template: Vec<String>,
    working_dir: Option<PathBuf>,
    children: Vec<Child>,
}

impl CommandBackend {
    pub fn new(template: Vec<String>) -> FrameBatchResult<Self> {
        if template.first().map_or(true, |program| program.trim().is_empty()) {
            return Err(FrameBatchError::config("Export command is empty"));
        }
        Ok(Self {
            template,
            working_dir: None,
            children: Vec::new(),
        })
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Expand the argv template for `job`.
    pub fn render_args(&self, job: &ExportJob) -> Vec<String> {
        let output = job.output_path.to_string_lossy();
        let filename = job.filename();
        let start = job.frame_start.to_string();
        let end = job.frame_end.to_string();

        self.template
            .iter()
            .map(|arg| {
                arg.replace("{output}", &output)
                    .replace("{filename}", &filename)
                    .replace("{start}", &start)
                    .replace("{end}", &end)
            })
            .collect()
    }

    /// Number of spawned processes not yet reaped.
    pub fn pending(&mut self) -> usize {
        self.reap();
        self.children.len()
    }

    fn reap(&mut self) {
        self.children.retain_mut(|child| match child.try_wait() {
            Ok(Some(status)) => {
                tracing::debug!(pid = child.id(), %status, "Export process exited");
                false
            }
            Ok(None) => true,
            Err(e) => {
                tracing::warn!(pid = child.id(), error = %e, "Failed to poll export process");
                false
            }
        });
    }
}

impl ExportBackend for CommandBackend {
    fn export(&mut self, job: &ExportJob) -> FrameBatchResult<()> {
        self.reap();

        let args = self.render_args(job);
        let (program, rest) = args
            .split_first()
            .ok_or_else(|| FrameBatchError::config("Export command is empty"))?;

        if let Some(parent) = job.output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut cmd = Command::new(program);
        cmd.args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        if let Some(dir) = &self.working_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| FrameBatchError::export(format!("Failed to start {program}: {e}")))?;

        tracing::debug!(
            pid = child.id(),
            program = %program,
            output = %job.output_path.display(),
            "Export process started"
        );
        self.children.push(child);
        Ok(())
    }

    fn is_available(&self) -> bool {
        self.template
            .first()
            .is_some_and(|program| command_exists(program))
    }

    fn name(&self) -> &str {
        "command"
    }
}

impl Drop for CommandBackend {
    fn drop(&mut self) {
        self.reap();
        if !self.children.is_empty() {
            tracing::debug!(
                running = self.children.len(),
                "Export processes still running at shutdown"
            );
        }
    }
}

fn command_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.components().count() > 1 {
        return path.is_file();
    }
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}
