//! Filesystem seam used to observe export output.

use std::io;
use std::path::Path;

use framebatch_model::naming::assets_dir_for;

/// Filesystem queries the sequencer relies on.
pub trait FileSystem {
    fn exists(&self, path: &Path) -> bool;

    /// Size of the file at `path` in bytes.
    fn size(&self, path: &Path) -> io::Result<u64>;

    fn is_dir(&self, path: &Path) -> bool;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn size(&self, path: &Path) -> io::Result<u64> {
        Ok(std::fs::metadata(path)?.len())
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_dir_all(path)
    }
}

/// Delete a stale export at `output` and its sidecar assets directory.
///
/// Best-effort: failures are logged and never stop the next export.
pub fn cleanup_previous_export(fs: &dyn FileSystem, output: &Path) {
    if fs.exists(output) {
        if let Err(e) = fs.remove_file(output) {
            tracing::debug!(path = %output.display(), error = %e, "Could not remove stale export");
        }
    }

    let assets = assets_dir_for(output);
    if fs.is_dir(&assets) {
        if let Err(e) = fs.remove_dir_all(&assets) {
            tracing::debug!(path = %assets.display(), error = %e, "Could not remove stale assets");
        }
    }
}
