//! Output file naming.
//!
//! Names are derived from an explicit base name or, failing that, from the
//! last segment of the configured source path. Range suffixes are stripped
//! before being recomputed so repeated resolution never stacks them.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::frame::Chunk;

/// Extension used when a name carries none.
pub const DEFAULT_EXTENSION: &str = ".orbx";

/// Name used when neither a base name nor a source path segment exists.
pub const PLACEHOLDER_NAME: &str = "export.orbx";

/// Suffix appended to an output's stem to name its sidecar assets directory.
pub const ASSETS_DIR_SUFFIX: &str = " assets";

// The pattern is a literal and always compiles.
static RANGE_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_frame_\d+_\d+$").expect("invalid range suffix regex"));

/// What a name is being resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameScope {
    /// A single export of the active range.
    Single { start: i64, end: i64 },
    /// One chunk of a batch.
    Chunk(Chunk),
}

impl NameScope {
    fn bounds(&self) -> (i64, i64) {
        match *self {
            NameScope::Single { start, end } => (start, end),
            NameScope::Chunk(chunk) => (chunk.start, chunk.end),
        }
    }
}

/// Resolve the output file name for a single export or a batch chunk.
///
/// Chunk names always carry `_F_<start>` so every chunk maps to a distinct
/// file, even when `append_range` is off.
pub fn resolve_name(
    base_name: &str,
    fallback_source: &str,
    scope: NameScope,
    append_range: bool,
) -> String {
    let base = base_filename(base_name, fallback_source);
    let (root, ext) = split_extension(base);
    let ext = if ext.is_empty() { DEFAULT_EXTENSION } else { ext };

    let mut root = strip_range_suffix(root).to_string();

    if let NameScope::Chunk(chunk) = scope {
        root = format!("{root}_F_{}", chunk.start);
    }

    if append_range {
        let (start, end) = scope.bounds();
        root = format!("{root}_frame_{start}_{end}");
    }

    root + ext
}

/// The single-export name as currently stored: base or fallback with the
/// default extension applied, without rewriting any suffix.
pub fn final_filename(base_name: &str, fallback_source: &str) -> String {
    let base = base_filename(base_name, fallback_source);
    let (root, ext) = split_extension(base);
    let ext = if ext.is_empty() { DEFAULT_EXTENSION } else { ext };
    format!("{root}{ext}")
}

/// Sidecar assets directory the exporter writes next to `output`.
pub fn assets_dir_for(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let (root, _) = split_extension(&name);
    let dir_name = format!("{root}{ASSETS_DIR_SUFFIX}");
    match output.parent() {
        Some(parent) => parent.join(dir_name),
        None => PathBuf::from(dir_name),
    }
}

/// Remove a trailing `_frame_<start>_<end>` from a name root.
pub fn strip_range_suffix(root: &str) -> &str {
    match RANGE_SUFFIX.find(root) {
        Some(m) => &root[..m.start()],
        None => root,
    }
}

/// Split `name` into `(root, extension)` where the extension includes the
/// dot. Leading dots belong to the root, so `.orbx` has no extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    let leading = name.len() - name.trim_start_matches('.').len();
    match name[leading..].rfind('.') {
        Some(i) => name.split_at(leading + i),
        None => (name, ""),
    }
}

/// Final path segment of a source path; empty when it ends in a separator.
pub fn last_path_segment(source: &str) -> &str {
    source.rsplit(['/', '\\']).next().unwrap_or("")
}

fn base_filename<'a>(base_name: &'a str, fallback_source: &'a str) -> &'a str {
    if !base_name.is_empty() {
        return base_name;
    }
    match last_path_segment(fallback_source) {
        "" => PLACEHOLDER_NAME,
        segment => segment,
    }
}
