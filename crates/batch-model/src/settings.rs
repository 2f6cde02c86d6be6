//! Batch parameters and the per-scene export settings record.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use framebatch_common::error::{FrameBatchError, FrameBatchResult};

use crate::frame::{Chunk, FrameRange, SceneTimeline};
use crate::naming::{final_filename, resolve_name, NameScope};

/// Lower bound accepted for the poll delay.
pub const MIN_POLL_DELAY_SECS: f64 = 0.1;

/// Upper bound accepted for the poll delay and the cooldown.
pub const MAX_DELAY_SECS: f64 = 3600.0;

/// Convert seconds to a [`Duration`], clamped to `[0, MAX_DELAY_SECS]`.
///
/// NaN maps to zero. Live values never go through `validate`, so this
/// must accept any float.
pub fn delay_from_secs(secs: f64) -> Duration {
    if secs.is_nan() {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(secs.clamp(0.0, MAX_DELAY_SECS))
}

/// User-tunable chunking and sequencing parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchParameters {
    /// Frames per chunk.
    pub step: i64,

    /// Extend each chunk on both sides (motion blur continuity).
    pub overlap_enabled: bool,

    /// Frames added before and after each chunk when overlap is enabled.
    pub overlap_frames: i64,

    /// Delay between filesystem checks (seconds).
    pub poll_delay_secs: f64,

    /// Extra wait after each chunk finishes (seconds).
    pub cooldown_secs: f64,
}

impl Default for BatchParameters {
    fn default() -> Self {
        Self {
            step: 20,
            overlap_enabled: false,
            overlap_frames: 1,
            poll_delay_secs: 1.0,
            cooldown_secs: 0.0,
        }
    }
}

impl BatchParameters {
    /// Check every field against its allowed range.
    pub fn validate(&self) -> FrameBatchResult<()> {
        if self.step < 1 {
            return Err(FrameBatchError::invalid_parameter(format!(
                "step must be >= 1 (got {})",
                self.step
            )));
        }
        if self.overlap_frames < 0 {
            return Err(FrameBatchError::invalid_parameter(format!(
                "overlap frames must be >= 0 (got {})",
                self.overlap_frames
            )));
        }
        if !(MIN_POLL_DELAY_SECS..=MAX_DELAY_SECS).contains(&self.poll_delay_secs) {
            return Err(FrameBatchError::invalid_parameter(format!(
                "poll delay must be within {MIN_POLL_DELAY_SECS}..={MAX_DELAY_SECS}s (got {})",
                self.poll_delay_secs
            )));
        }
        if !(0.0..=MAX_DELAY_SECS).contains(&self.cooldown_secs) {
            return Err(FrameBatchError::invalid_parameter(format!(
                "cooldown must be within 0..={MAX_DELAY_SECS}s (got {})",
                self.cooldown_secs
            )));
        }
        Ok(())
    }

    /// Overlap actually applied when planning (0 when disabled).
    pub fn effective_overlap(&self) -> i64 {
        if self.overlap_enabled {
            self.overlap_frames
        } else {
            0
        }
    }

    pub fn poll_delay(&self) -> Duration {
        delay_from_secs(self.poll_delay_secs)
    }
}

/// Per-scene export settings.
///
/// Writing fields directly never recomputes anything. The `set_*` methods
/// are the designated setters: they push the custom range onto the scene
/// when requested and refresh `filename`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Directory and/or base path. A leading `//` is relative to the
    /// working directory.
    pub filepath: String,

    /// Explicit output name. Empty derives it from `filepath`.
    pub filename: String,

    /// Single export uses the scene range instead of the custom range.
    pub use_scene_range: bool,

    /// Custom single-export range.
    pub frame_start: i64,
    pub frame_end: i64,

    /// Append `_frame_<start>_<end>` to output names.
    pub append_frame_range: bool,

    /// Keep the scene timeline synced with the custom range.
    pub update_frame_range: bool,

    /// Gate for planning and the batch drivers.
    pub batch_enabled: bool,

    /// Enable flag for the auto sequencer, read on every tick.
    pub auto_batch: bool,

    pub batch: BatchParameters,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            filepath: "//my_export.orbx".to_string(),
            filename: "my_export.orbx".to_string(),
            use_scene_range: true,
            frame_start: 0,
            frame_end: 10,
            append_frame_range: false,
            update_frame_range: false,
            batch_enabled: false,
            auto_batch: false,
            batch: BatchParameters::default(),
        }
    }
}

impl ExportSettings {
    /// Range a single export covers.
    pub fn effective_range(&self, scene: &SceneTimeline) -> FrameBatchResult<FrameRange> {
        if self.use_scene_range {
            scene.range()
        } else {
            FrameRange::new(self.frame_start, self.frame_end)
        }
    }

    pub fn set_use_scene_range(&mut self, value: bool, scene: &mut SceneTimeline) {
        self.use_scene_range = value;
        self.sync(scene);
    }

    pub fn set_custom_range(&mut self, start: i64, end: i64, scene: &mut SceneTimeline) {
        self.frame_start = start;
        self.frame_end = end;
        self.sync(scene);
    }

    pub fn set_append_frame_range(&mut self, value: bool, scene: &mut SceneTimeline) {
        self.append_frame_range = value;
        self.sync(scene);
    }

    pub fn set_update_frame_range(&mut self, value: bool, scene: &mut SceneTimeline) {
        self.update_frame_range = value;
        self.sync(scene);
    }

    /// Push the custom range onto the scene (if requested) and recompute
    /// `filename` for the effective single-export range.
    pub fn sync(&mut self, scene: &mut SceneTimeline) {
        if !self.use_scene_range && self.update_frame_range {
            scene.start = self.frame_start;
            scene.end = self.frame_end;
        }

        let (start, end) = if self.use_scene_range {
            (scene.start, scene.end)
        } else {
            (self.frame_start, self.frame_end)
        };

        self.filename = resolve_name(
            &self.filename,
            &self.filepath,
            NameScope::Single { start, end },
            self.append_frame_range,
        );
    }

    /// Directory exports are written to.
    pub fn output_dir(&self, working_dir: &Path) -> PathBuf {
        let (is_relative, raw) = match self.filepath.strip_prefix("//") {
            Some(rest) => (true, rest),
            None => (false, self.filepath.as_str()),
        };

        let dir_part = if raw.ends_with(['/', '\\']) {
            raw.trim_end_matches(['/', '\\'])
        } else {
            match raw.rfind(['/', '\\']) {
                Some(i) => &raw[..i],
                None => "",
            }
        };

        if dir_part.is_empty() {
            if !is_relative && raw.starts_with(['/', '\\']) {
                return PathBuf::from("/");
            }
            return working_dir.to_path_buf();
        }

        let dir = Path::new(dir_part);
        if is_relative || dir.is_relative() {
            working_dir.join(dir)
        } else {
            dir.to_path_buf()
        }
    }

    /// Full output path of a single export.
    pub fn single_output_path(&self, working_dir: &Path) -> PathBuf {
        self.output_dir(working_dir)
            .join(final_filename(&self.filename, &self.filepath))
    }

    /// Full output path of one batch chunk.
    pub fn chunk_output_path(&self, working_dir: &Path, chunk: Chunk) -> PathBuf {
        self.output_dir(working_dir).join(resolve_name(
            &self.filename,
            &self.filepath,
            NameScope::Chunk(chunk),
            self.append_frame_range,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_validation() {
        assert!(BatchParameters::default().validate().is_ok());

        let bad_step = BatchParameters {
            step: 0,
            ..Default::default()
        };
        assert!(matches!(
            bad_step.validate(),
            Err(FrameBatchError::InvalidParameter { .. })
        ));

        let bad_delay = BatchParameters {
            poll_delay_secs: 0.05,
            ..Default::default()
        };
        assert!(bad_delay.validate().is_err());

        let nan_cooldown = BatchParameters {
            cooldown_secs: f64::NAN,
            ..Default::default()
        };
        assert!(nan_cooldown.validate().is_err());
    }

    #[test]
    fn test_unbounded_delays_rejected() {
        for secs in [f64::INFINITY, 1e20, MAX_DELAY_SECS + 1.0] {
            let delay = BatchParameters {
                poll_delay_secs: secs,
                ..Default::default()
            };
            assert!(delay.validate().is_err(), "poll delay {secs}");

            let cooldown = BatchParameters {
                cooldown_secs: secs,
                ..Default::default()
            };
            assert!(cooldown.validate().is_err(), "cooldown {secs}");
        }

        let edge = BatchParameters {
            poll_delay_secs: MAX_DELAY_SECS,
            cooldown_secs: MAX_DELAY_SECS,
            ..Default::default()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_delay_from_secs_never_panics() {
        let cap = Duration::from_secs_f64(MAX_DELAY_SECS);
        assert_eq!(delay_from_secs(1e20), cap);
        assert_eq!(delay_from_secs(f64::INFINITY), cap);
        assert_eq!(delay_from_secs(f64::NEG_INFINITY), Duration::ZERO);
        assert_eq!(delay_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(delay_from_secs(-3.0), Duration::ZERO);
        assert_eq!(delay_from_secs(1.5), Duration::from_millis(1500));

        let live = BatchParameters {
            poll_delay_secs: 1e20,
            ..Default::default()
        };
        assert_eq!(live.poll_delay(), cap);
    }

    #[test]
    fn test_effective_overlap() {
        let mut params = BatchParameters {
            overlap_frames: 3,
            ..Default::default()
        };
        assert_eq!(params.effective_overlap(), 0);
        params.overlap_enabled = true;
        assert_eq!(params.effective_overlap(), 3);
    }

    #[test]
    fn test_setter_refreshes_filename() {
        let mut scene = SceneTimeline::new(1, 250);
        let mut settings = ExportSettings::default();

        settings.set_append_frame_range(true, &mut scene);
        assert_eq!(settings.filename, "my_export_frame_1_250.orbx");

        settings.set_use_scene_range(false, &mut scene);
        assert_eq!(settings.filename, "my_export_frame_0_10.orbx");

        settings.set_custom_range(5, 15, &mut scene);
        assert_eq!(settings.filename, "my_export_frame_5_15.orbx");
        // The scene is untouched until update_frame_range is on.
        assert_eq!((scene.start, scene.end), (1, 250));

        settings.set_update_frame_range(true, &mut scene);
        assert_eq!((scene.start, scene.end), (5, 15));

        settings.set_append_frame_range(false, &mut scene);
        assert_eq!(settings.filename, "my_export.orbx");
    }

    #[test]
    fn test_direct_field_write_does_not_recompute() {
        let mut settings = ExportSettings::default();
        settings.append_frame_range = true;
        assert_eq!(settings.filename, "my_export.orbx");
    }

    #[test]
    fn test_effective_range() {
        let scene = SceneTimeline::new(1, 100);
        let mut settings = ExportSettings::default();
        assert_eq!(
            settings.effective_range(&scene).unwrap(),
            FrameRange::new(1, 100).unwrap()
        );

        settings.use_scene_range = false;
        settings.frame_start = 20;
        settings.frame_end = 10;
        assert!(settings.effective_range(&scene).is_err());
    }

    #[test]
    fn test_output_dir() {
        let cwd = Path::new("/work");
        let mut settings = ExportSettings::default();
        assert_eq!(settings.output_dir(cwd), PathBuf::from("/work"));

        settings.filepath = "//renders/city.orbx".to_string();
        assert_eq!(settings.output_dir(cwd), PathBuf::from("/work/renders"));

        settings.filepath = "/mnt/out/".to_string();
        assert_eq!(settings.output_dir(cwd), PathBuf::from("/mnt/out"));

        settings.filepath = "/city.orbx".to_string();
        assert_eq!(settings.output_dir(cwd), PathBuf::from("/"));

        settings.filepath = String::new();
        assert_eq!(settings.output_dir(cwd), PathBuf::from("/work"));
    }

    #[test]
    fn test_chunk_output_path() {
        let settings = ExportSettings {
            filepath: "/mnt/out/".to_string(),
            filename: "shot.orbx".to_string(),
            ..Default::default()
        };
        assert_eq!(
            settings.chunk_output_path(Path::new("/work"), Chunk::new(40, 45)),
            PathBuf::from("/mnt/out/shot_F_40.orbx")
        );
        assert_eq!(
            settings.single_output_path(Path::new("/work")),
            PathBuf::from("/mnt/out/shot.orbx")
        );
    }
}
