//! Frame ranges, chunks, and chunk plans.
//!
//! Frames are signed integers so overlap expansion can be computed before
//! clamping without underflow. Valid ranges never start below zero.

use serde::{Deserialize, Serialize};

use framebatch_common::error::{FrameBatchError, FrameBatchResult};

/// An inclusive range of frames `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFrameRange")]
pub struct FrameRange {
    start: i64,
    end: i64,
}

/// Unvalidated wire form of [`FrameRange`].
#[derive(Deserialize)]
struct RawFrameRange {
    start: i64,
    end: i64,
}

impl TryFrom<RawFrameRange> for FrameRange {
    type Error = FrameBatchError;

    fn try_from(raw: RawFrameRange) -> FrameBatchResult<Self> {
        Self::new(raw.start, raw.end)
    }
}

impl FrameRange {
    /// Create a range, rejecting negative starts and inverted bounds.
    pub fn new(start: i64, end: i64) -> FrameBatchResult<Self> {
        if start < 0 || end < start {
            return Err(FrameBatchError::invalid_range(start, end));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    /// Number of frames in the range.
    pub fn len(&self) -> i64 {
        self.end - self.start + 1
    }

    /// Always false; a valid range holds at least one frame.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, frame: i64) -> bool {
        frame >= self.start && frame <= self.end
    }
}

/// A contiguous sub-range of frames exported as one output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Chunk {
    pub start: i64,
    pub end: i64,
}

impl Chunk {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Number of frames covered by this chunk.
    pub fn frame_count(&self) -> i64 {
        self.end - self.start + 1
    }

    pub fn contains(&self, frame: i64) -> bool {
        frame >= self.start && frame <= self.end
    }

    /// Number of frames shared with `other` (0 when disjoint).
    pub fn overlap_with(&self, other: &Chunk) -> i64 {
        let lo = self.start.max(other.start);
        let hi = self.end.min(other.end);
        (hi - lo + 1).max(0)
    }
}

/// Ordered chunks produced by a single planning call.
///
/// Insertion order is execution order, ascending by start frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPlan {
    /// The range the plan was computed from.
    pub range: FrameRange,

    /// Frames per unexpanded window.
    pub step: i64,

    /// Overlap applied on both sides of every window (0 when disabled).
    pub overlap: i64,

    chunks: Vec<Chunk>,
}

impl ChunkPlan {
    pub fn new(range: FrameRange, step: i64, overlap: i64, chunks: Vec<Chunk>) -> Self {
        Self {
            range,
            step,
            overlap,
            chunks,
        }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn get(&self, index: usize) -> Option<&Chunk> {
        self.chunks.get(index)
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chunk> {
        self.chunks.iter()
    }

    /// Serialize the plan as pretty JSON.
    pub fn to_json(&self) -> FrameBatchResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a plan previously written by [`ChunkPlan::to_json`].
    pub fn from_json(json: &str) -> FrameBatchResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

impl<'a> IntoIterator for &'a ChunkPlan {
    type Item = &'a Chunk;
    type IntoIter = std::slice::Iter<'a, Chunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.chunks.iter()
    }
}

/// Position of the manual driver within the current plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualCursor {
    pub next_index: usize,
}

impl ManualCursor {
    /// The cursor after one more chunk has been exported.
    pub fn advanced(self) -> Self {
        Self {
            next_index: self.next_index + 1,
        }
    }

    pub fn reset(&mut self) {
        self.next_index = 0;
    }
}

/// The host's scene timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneTimeline {
    pub start: i64,
    pub end: i64,

    /// Frame the playhead sits on.
    pub current: i64,
}

impl SceneTimeline {
    pub fn new(start: i64, end: i64) -> Self {
        Self {
            start,
            end,
            current: start,
        }
    }

    /// The scene range, validated.
    pub fn range(&self) -> FrameBatchResult<FrameRange> {
        FrameRange::new(self.start, self.end)
    }
}
