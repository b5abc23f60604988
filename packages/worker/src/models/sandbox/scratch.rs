use std::path::{Path, PathBuf};

use tracing::warn;
use uuid::Uuid;

use super::language::{INPUT_FILE, Language};

/// Per-execution scratch directory, removed with everything in it on drop.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<root>/<id>/` and write the source file and stdin into it.
    pub async fn prepare(
        root: &Path,
        id: Uuid,
        language: Language,
        code: &str,
        stdin: &str,
    ) -> std::io::Result<Self> {
        let path = root.join(id.to_string());
        tokio::fs::create_dir_all(&path).await?;
        // Owning the directory from here on guarantees cleanup if a write fails.
        let dir = Self { path };
        tokio::fs::write(dir.path.join(language.source_file()), code).await?;
        tokio::fs::write(dir.path.join(INPUT_FILE), stdin).await?;
        Ok(dir)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            warn!(path = %self.path.display(), error = %e, "Failed to remove scratch directory");
        }
    }
}
