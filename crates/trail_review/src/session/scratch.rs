use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::error::Result;

/// Working copies of the diagnostics being edited, removed with the session.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    pub fn new() -> Result<Self> {
        let dir = tempfile::Builder::new().prefix("trail-review-").tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn trail_diagnostic(&self) -> PathBuf {
        self.dir.path().join("current_trail_diagnostic.png")
    }

    pub fn image_diagnostic(&self) -> PathBuf {
        self.dir.path().join("current_image_diagnostic.png")
    }

    pub fn clear_trail(&self) -> Result<()> {
        remove_if_present(&self.trail_diagnostic())
    }

    /// Replaces the working trail diagnostic with `bytes`.
    pub fn restore_trail(&self, bytes: &[u8]) -> Result<()> {
        fs::write(self.trail_diagnostic(), bytes)?;
        Ok(())
    }

    /// Resets the working image diagnostic to the persisted one, or clears it if there is none.
    pub fn reset_image(&self, persisted: &Path) -> Result<()> {
        if persisted.is_file() {
            fs::copy(persisted, self.image_diagnostic())?;
            Ok(())
        } else {
            remove_if_present(&self.image_diagnostic())
        }
    }
}

fn remove_if_present(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != std::io::ErrorKind::NotFound => Err(err.into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_image_tracks_persisted_copy() {
        let scratch = ScratchSpace::new().expect("Should create scratch space");
        let persisted = scratch.path().join("persisted.png");

        fs::write(&persisted, b"v1").expect("Should write");
        scratch.reset_image(&persisted).expect("Should reset");
        assert_eq!(fs::read(scratch.image_diagnostic()).expect("Should read"), b"v1");

        fs::remove_file(&persisted).expect("Should remove");
        scratch.reset_image(&persisted).expect("Should reset");
        assert!(!scratch.image_diagnostic().exists());
    }

    #[test]
    fn test_directory_is_released_on_drop() {
        let scratch = ScratchSpace::new().expect("Should create scratch space");
        let path = scratch.path().to_path_buf();
        scratch.restore_trail(b"png").expect("Should write");
        assert!(path.is_dir());

        drop(scratch);
        assert!(!path.exists());
    }
}
