//! Subcommands and the flags they share.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use framebatch_common::config::AppConfig;
use framebatch_model::frame::{ChunkPlan, SceneTimeline};
use framebatch_model::settings::{BatchParameters, ExportSettings};
use framebatch_planner::prepare_batch;
use framebatch_sequencer::{CommandBackend, ExportBackend};

pub mod auto;
pub mod config;
pub mod manual;
pub mod name;
pub mod plan;
pub mod single;

/// Frame range to work on.
#[derive(Debug, Clone, Args)]
pub struct RangeArgs {
    /// First frame (inclusive)
    #[arg(long)]
    pub start: i64,

    /// Last frame (inclusive)
    #[arg(long)]
    pub end: i64,
}

impl RangeArgs {
    pub fn scene(&self) -> SceneTimeline {
        SceneTimeline::new(self.start, self.end)
    }
}

/// Where exports are written.
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output directory or base path (`//` is relative to the working directory)
    #[arg(long)]
    pub filepath: Option<String>,

    /// Output file name
    #[arg(long)]
    pub filename: Option<String>,

    /// Append `_frame_<start>_<end>` to output names
    #[arg(long)]
    pub append_range: bool,

    /// Directory `//` paths are resolved against [default: current directory]
    #[arg(long)]
    pub working_dir: Option<PathBuf>,
}

impl OutputArgs {
    pub fn working_dir(&self) -> anyhow::Result<PathBuf> {
        match &self.working_dir {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir().context("Failed to read the current directory"),
        }
    }
}

/// Chunking and polling parameters.
#[derive(Debug, Clone, Args)]
pub struct BatchArgs {
    /// Frames per chunk
    #[arg(long)]
    pub step: Option<i64>,

    /// Frames added on both sides of every chunk (0 disables overlap)
    #[arg(long)]
    pub overlap: Option<i64>,

    /// Seconds between output file checks
    #[arg(long)]
    pub poll_delay: Option<f64>,

    /// Extra seconds to wait after each chunk
    #[arg(long)]
    pub cooldown: Option<f64>,
}

/// Where the chunk plan comes from.
#[derive(Debug, Clone, Args)]
pub struct PlanSource {
    /// Use a plan saved with `plan --json` instead of planning the range
    #[arg(long = "plan", value_name = "FILE")]
    pub plan_file: Option<PathBuf>,
}

impl PlanSource {
    /// Load the saved plan, or plan the scene range from `settings`.
    pub fn resolve(
        &self,
        settings: &ExportSettings,
        scene: &SceneTimeline,
    ) -> anyhow::Result<ChunkPlan> {
        match &self.plan_file {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read plan {}", path.display()))?;
                let chunk_plan = ChunkPlan::from_json(&json)
                    .with_context(|| format!("Invalid plan {}", path.display()))?;
                tracing::info!(
                    chunks = chunk_plan.len(),
                    path = %path.display(),
                    "Loaded saved plan"
                );
                Ok(chunk_plan)
            }
            None => Ok(prepare_batch(settings, scene)?),
        }
    }
}

/// Export command override.
#[derive(Debug, Clone, Args)]
pub struct ExporterArgs {
    /// Export command and arguments; `{output}`, `{filename}`, `{start}`
    /// and `{end}` are substituted per export
    #[arg(last = true)]
    pub command: Vec<String>,
}

/// Build export settings from config defaults with flag overrides applied.
pub fn export_settings(
    config: &AppConfig,
    output: &OutputArgs,
    batch: &BatchArgs,
) -> anyhow::Result<ExportSettings> {
    let defaults = &config.defaults;
    let overlap = batch.overlap.unwrap_or(defaults.overlap_frames);

    let settings = ExportSettings {
        filepath: output
            .filepath
            .clone()
            .unwrap_or_else(|| defaults.filepath.clone()),
        filename: output
            .filename
            .clone()
            .unwrap_or_else(|| defaults.filename.clone()),
        append_frame_range: output.append_range || defaults.append_frame_range,
        batch_enabled: true,
        batch: BatchParameters {
            step: batch.step.unwrap_or(defaults.step),
            overlap_enabled: overlap != 0,
            overlap_frames: overlap,
            poll_delay_secs: batch.poll_delay.unwrap_or(defaults.poll_delay_secs),
            cooldown_secs: batch.cooldown.unwrap_or(defaults.cooldown_secs),
        },
        ..Default::default()
    };

    settings.batch.validate()?;
    Ok(settings)
}

/// The command backend, from the flag override or the config file.
pub fn command_backend(
    config: &AppConfig,
    exporter: ExporterArgs,
) -> anyhow::Result<CommandBackend> {
    let command = if exporter.command.is_empty() {
        config.exporter.command.clone()
    } else {
        exporter.command
    };

    let mut backend = CommandBackend::new(command).context(
        "No export command configured; set exporter.command in the config file or pass one after `--`",
    )?;
    if let Some(dir) = &config.exporter.working_dir {
        backend = backend.with_working_dir(dir);
    }

    if !backend.is_available() {
        tracing::warn!("Export command was not found on PATH; exports will fail to start");
    }
    Ok(backend)
}
