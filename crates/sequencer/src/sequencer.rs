//! Auto-batch sequencer: the completion-inference state machine.
//!
//! The exporter gives no completion signal, so a chunk counts as finished
//! once its output file has been observed at the same size on
//! `stable_polls` consecutive polls. A poll budget force-advances chunks
//! whose export hangs or dies.
//!
//! # States
//!
//! ```text
//! Idle(i) ──export──▶ Waiting(i) ──stable / timeout──▶ Idle(i+1) ─ … ─▶ Completed
//!    │                    │
//!    └──── stop / disable / host gone ───▶ Stopped | Aborted
//! ```
//!
//! The session never sleeps. Every [`SequencerSession::tick`] runs to
//! completion and returns when it wants to be called again.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use framebatch_common::config::CompletionConfig;
use framebatch_common::error::{FrameBatchError, FrameBatchResult};
use framebatch_model::frame::{Chunk, ChunkPlan};
use framebatch_model::settings::{delay_from_secs, BatchParameters, ExportSettings};

use crate::backend::{ExportBackend, ExportJob};
use crate::fs::{cleanup_previous_export, FileSystem};
use crate::host::HostContext;

/// Floor applied to the delay after starting or finishing a chunk.
pub const MIN_TICK_SECS: f64 = 0.5;

/// What the external scheduler should do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// Call `tick` again after this delay.
    Reschedule(Duration),
    /// The session is over; deregister it.
    Done,
}

/// Per-chunk phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Next tick starts the current chunk.
    Idle,
    /// Export started; watching the output file.
    Waiting,
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Running,
    /// Every chunk was processed.
    Completed,
    /// Cancelled, or the enable flag was turned off.
    Stopped,
    /// The host scene went away mid-run.
    Aborted,
}

/// Thresholds of the completion heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionPolicy {
    /// Consecutive unchanged size observations that count as finished.
    pub stable_polls: u32,

    /// A chunk is force-advanced once its poll count exceeds this.
    pub max_polls: u32,
}

impl Default for CompletionPolicy {
    fn default() -> Self {
        Self {
            stable_polls: 3,
            max_polls: 600,
        }
    }
}

impl From<&CompletionConfig> for CompletionPolicy {
    fn from(config: &CompletionConfig) -> Self {
        Self {
            stable_polls: config.stable_polls.max(1),
            max_polls: config.max_polls,
        }
    }
}

/// A chunk with its resolved output path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedExport {
    pub chunk: Chunk,
    pub output_path: PathBuf,
}

/// Cloneable handle that cancels a session from elsewhere (e.g. a signal
/// handler). Takes effect on the session's next tick.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Returns whether the session was still running.
    pub fn stop(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Read-only snapshot of a session for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    pub phase: Phase,
    /// Zero-based index of the chunk in progress.
    pub current_index: usize,
    pub total: usize,
    pub poll_count: u32,
    pub stable_count: u32,
    pub last_observed_size: u64,
    pub timed_out: usize,
    pub failed: usize,
    /// Wall-clock start of the run (RFC 3339).
    pub started_at: String,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.state {
            SessionState::Running => {
                let phase = match self.phase {
                    Phase::Idle => "idle",
                    Phase::Waiting => "waiting",
                };
                write!(
                    f,
                    "Status: {phase} (chunk {}/{})",
                    self.current_index + 1,
                    self.total
                )
            }
            _ => write!(f, "Status: idle"),
        }
    }
}

/// Final tally of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    pub state: SessionState,
    /// Chunks whose output settled normally.
    pub completed: usize,
    /// Chunks force-advanced by the poll budget.
    pub timed_out: usize,
    /// Chunks whose export could not be started.
    pub failed: usize,
    pub total: usize,
}

/// One live auto-batch run.
pub struct SequencerSession {
    running: Arc<AtomicBool>,
    plan: Vec<PlannedExport>,
    current_index: usize,
    phase: Phase,
    current_output_path: PathBuf,
    last_observed_size: u64,
    stable_count: u32,
    poll_count: u32,
    saved_frame: Option<i64>,
    first_delay: Duration,
    policy: CompletionPolicy,
    state: SessionState,
    timed_out: usize,
    failed: usize,
    started_at: String,
}

impl SequencerSession {
    fn new(
        plan: Vec<PlannedExport>,
        saved_frame: Option<i64>,
        params: &BatchParameters,
        policy: CompletionPolicy,
    ) -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            plan,
            current_index: 0,
            phase: Phase::Idle,
            current_output_path: PathBuf::new(),
            last_observed_size: 0,
            stable_count: 0,
            poll_count: 0,
            saved_frame,
            first_delay: start_delay(params),
            policy,
            state: SessionState::Running,
            timed_out: 0,
            failed: 0,
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Delay before the first tick.
    pub fn first_delay(&self) -> Duration {
        self.first_delay
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cancellation; the next tick terminates.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(self.running.clone())
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_output_path(&self) -> &Path {
        &self.current_output_path
    }

    pub fn plan(&self) -> &[PlannedExport] {
        &self.plan
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.state,
            phase: self.phase,
            current_index: self.current_index,
            total: self.plan.len(),
            poll_count: self.poll_count,
            stable_count: self.stable_count,
            last_observed_size: self.last_observed_size,
            timed_out: self.timed_out,
            failed: self.failed,
            started_at: self.started_at.clone(),
        }
    }

    pub fn outcome(&self) -> BatchOutcome {
        let processed = self.current_index.min(self.plan.len());
        BatchOutcome {
            state: self.state,
            completed: processed.saturating_sub(self.timed_out + self.failed),
            timed_out: self.timed_out,
            failed: self.failed,
            total: self.plan.len(),
        }
    }

    /// Advance the state machine by one step.
    pub fn tick(
        &mut self,
        host: &mut dyn HostContext,
        backend: &mut dyn ExportBackend,
        fs: &dyn FileSystem,
    ) -> Tick {
        if !self.is_running() {
            if self.state == SessionState::Running {
                self.state = SessionState::Stopped;
            }
            return Tick::Done;
        }

        if !host.is_available() {
            self.finish(SessionState::Aborted);
            return Tick::Done;
        }

        if !host.auto_batch_enabled() {
            tracing::info!("Auto batch stopped (auto batch disabled)");
            self.finish(SessionState::Stopped);
            return Tick::Done;
        }

        if self.current_index >= self.plan.len() {
            if let Some(frame) = self.saved_frame {
                host.set_current_frame(frame);
            }
            tracing::info!(
                chunks = self.plan.len(),
                timed_out = self.timed_out,
                failed = self.failed,
                "Auto batch complete"
            );
            self.finish(SessionState::Completed);
            return Tick::Done;
        }

        let params = host.parameters();
        match self.phase {
            Phase::Idle => self.start_chunk(host, backend, fs, &params),
            Phase::Waiting => self.poll_chunk(fs, &params),
        }
    }

    fn start_chunk(
        &mut self,
        host: &mut dyn HostContext,
        backend: &mut dyn ExportBackend,
        fs: &dyn FileSystem,
        params: &BatchParameters,
    ) -> Tick {
        let planned = &self.plan[self.current_index];
        let job = ExportJob::new(
            planned.output_path.clone(),
            planned.chunk.start,
            planned.chunk.end,
        );

        host.set_current_frame(job.frame_start);

        tracing::info!(
            chunk = self.current_index + 1,
            total = self.plan.len(),
            path = %job.output_path.display(),
            "Starting chunk {}/{}: {} frames {}-{}",
            self.current_index + 1,
            self.plan.len(),
            job.filename(),
            job.frame_start,
            job.frame_end
        );

        cleanup_previous_export(fs, &job.output_path);

        if let Err(e) = backend.export(&job) {
            tracing::warn!(
                chunk = self.current_index + 1,
                error = %e,
                "Export failed to start; skipping {}",
                job.filename()
            );
            self.failed += 1;
            self.advance();
            return Tick::Reschedule(cooldown_delay(params));
        }

        self.current_output_path = job.output_path;
        self.last_observed_size = 0;
        self.stable_count = 0;
        self.poll_count = 0;
        self.phase = Phase::Waiting;

        Tick::Reschedule(start_delay(params))
    }

    fn poll_chunk(&mut self, fs: &dyn FileSystem, params: &BatchParameters) -> Tick {
        self.poll_count += 1;
        let path = &self.current_output_path;

        if fs.exists(path) {
            match fs.size(path) {
                Ok(size) if size != self.last_observed_size => {
                    self.last_observed_size = size;
                    self.stable_count = 0;
                }
                Ok(_) => self.stable_count += 1,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Could not stat export");
                }
            }

            if self.stable_count >= self.policy.stable_polls {
                tracing::info!(
                    chunk = self.current_index + 1,
                    size = self.last_observed_size,
                    polls = self.poll_count,
                    "Chunk {} complete: {}",
                    self.current_index + 1,
                    display_name(path)
                );
                self.advance();
                return Tick::Reschedule(cooldown_delay(params));
            }
        } else if self.last_observed_size != 0 {
            // The file vanished after being seen; wait for it to reappear.
            self.last_observed_size = 0;
            self.stable_count = 0;
        }

        if self.poll_count > self.policy.max_polls {
            tracing::warn!(
                chunk = self.current_index + 1,
                polls = self.poll_count,
                "Timeout waiting for {}",
                display_name(path)
            );
            self.timed_out += 1;
            self.advance();
            return Tick::Reschedule(cooldown_delay(params));
        }

        Tick::Reschedule(params.poll_delay())
    }

    fn advance(&mut self) {
        self.current_index += 1;
        self.phase = Phase::Idle;
    }

    fn finish(&mut self, state: SessionState) {
        self.running.store(false, Ordering::SeqCst);
        self.state = state;
    }
}

/// Owner of the single auto-batch slot.
///
/// At most one session runs at a time; `start` fails while one is live.
/// Dropping the controller cancels the live session.
#[derive(Debug, Default)]
pub struct AutoBatchController {
    active: Option<StopHandle>,
    policy: CompletionPolicy,
}

impl AutoBatchController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_policy(policy: CompletionPolicy) -> Self {
        Self {
            active: None,
            policy,
        }
    }

    pub fn policy(&self) -> CompletionPolicy {
        self.policy
    }

    /// Start a session over `plan`.
    ///
    /// Resolves every chunk's output path up front and remembers
    /// `current_frame` so it can be restored when the run completes.
    pub fn start(
        &mut self,
        settings: &ExportSettings,
        plan: &ChunkPlan,
        current_frame: i64,
        working_dir: &Path,
    ) -> FrameBatchResult<SequencerSession> {
        if self.is_running() {
            return Err(FrameBatchError::AlreadyRunning);
        }
        if !settings.batch_enabled {
            return Err(FrameBatchError::batch(
                "Enable batch export and prepare chunks first",
            ));
        }
        if !settings.auto_batch {
            return Err(FrameBatchError::batch("Enable auto batch first"));
        }
        if plan.is_empty() {
            return Err(FrameBatchError::batch(
                "No chunks prepared. Prepare batch chunks first.",
            ));
        }

        let planned = plan
            .iter()
            .map(|&chunk| PlannedExport {
                chunk,
                output_path: settings.chunk_output_path(working_dir, chunk),
            })
            .collect::<Vec<_>>();

        let session =
            SequencerSession::new(planned, Some(current_frame), &settings.batch, self.policy);
        self.active = Some(session.stop_handle());

        tracing::info!(chunks = plan.len(), "Started auto batch for {} chunks", plan.len());
        Ok(session)
    }

    pub fn is_running(&self) -> bool {
        self.active.as_ref().is_some_and(StopHandle::is_running)
    }

    /// Cancel the live session, if any. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        let was_running = self.active.take().is_some_and(|handle| handle.stop());
        if was_running {
            tracing::info!("Stopped auto batch");
        } else {
            tracing::info!("Auto batch is not running");
        }
        was_running
    }

    /// Force the live session off when the owning system goes away.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.stop();
        }
    }
}

impl Drop for AutoBatchController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn start_delay(params: &BatchParameters) -> Duration {
    delay_from_secs(params.poll_delay_secs.max(MIN_TICK_SECS))
}

fn cooldown_delay(params: &BatchParameters) -> Duration {
    delay_from_secs((params.poll_delay_secs + params.cooldown_secs).max(MIN_TICK_SECS))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
