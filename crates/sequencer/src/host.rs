//! Host scene seam.
//!
//! The sequencer reads its live parameters and enable flag through this
//! trait on every tick, and moves the scene playhead to each chunk.

use framebatch_model::frame::SceneTimeline;
use framebatch_model::settings::{BatchParameters, ExportSettings};

/// What the drivers need from the host application.
pub trait HostContext {
    /// False once the owning scene is gone.
    fn is_available(&self) -> bool;

    /// Auto-batch enable flag, read live.
    fn auto_batch_enabled(&self) -> bool;

    /// Current batch parameters, read live.
    fn parameters(&self) -> BatchParameters;

    fn current_frame(&self) -> i64;

    fn set_current_frame(&mut self, frame: i64);
}

/// A host made of plain settings and a timeline.
#[derive(Debug, Clone)]
pub struct SceneHost {
    pub settings: ExportSettings,
    pub scene: SceneTimeline,
    closed: bool,
}

impl SceneHost {
    pub fn new(settings: ExportSettings, scene: SceneTimeline) -> Self {
        Self {
            settings,
            scene,
            closed: false,
        }
    }

    /// Mark the scene as gone; running sessions abort on their next tick.
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl HostContext for SceneHost {
    fn is_available(&self) -> bool {
        !self.closed
    }

    fn auto_batch_enabled(&self) -> bool {
        self.settings.auto_batch
    }

    fn parameters(&self) -> BatchParameters {
        self.settings.batch.clone()
    }

    fn current_frame(&self) -> i64 {
        self.scene.current
    }

    fn set_current_frame(&mut self, frame: i64) {
        self.scene.current = frame;
    }
}
