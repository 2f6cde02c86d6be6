//! FrameBatch Sequencer
//!
//! Drives an external export primitive over a chunk plan:
//! - **Manual:** one chunk per explicit request, tracked by a cursor
//! - **Auto:** a polling state machine that infers completion from the
//!   output file's size settling on disk, with a timeout safety net
//! - **Single:** one export of the whole active range
//!
//! # Auto-batch flow
//!
//! ```text
//! ChunkPlan ──▶ AutoBatchController::start ──▶ SequencerSession
//!                                                   │ tick()
//!                       ┌───────────────────────────┤
//!                       ▼                           ▼
//!              ExportBackend::export        FileSystem::size (poll)
//!                                                   │
//!                                    Reschedule(delay) | Done
//!                                                   ▼
//!                                       driver::drive (tokio sleep)
//! ```

pub mod backend;
pub mod driver;
pub mod fs;
pub mod host;
pub mod manual;
pub mod sequencer;
pub mod single;

pub use backend::{CommandBackend, ExportBackend, ExportJob};
pub use driver::{drive, drive_until_interrupted};
pub use fs::{FileSystem, StdFileSystem};
pub use host::{HostContext, SceneHost};
pub use manual::{export_next, ManualBatch, ManualExport};
pub use sequencer::{
    AutoBatchController, BatchOutcome, CompletionPolicy, Phase, SequencerSession, SessionState,
    SessionStatus, StopHandle, Tick,
};
pub use single::export_single;
