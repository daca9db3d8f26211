//! Per-user working directories for transient images
//!
//! Layout: `<root>/<username>_<id>/original/<uuid>.jpg` for uploads and
//! `<root>/<username>_<id>/processed/<uuid>.jpg` for redacted output.

use crate::error::Result;
use crate::store::SessionId;
use image::{ImageFormat, RgbImage};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

const ORIGINAL_DIR: &str = "original";
const PROCESSED_DIR: &str = "processed";

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn user_dir(&self, id: SessionId, username: Option<&str>) -> PathBuf {
        let handle: String = username
            .unwrap_or("user")
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
            .collect();
        let handle = if handle.is_empty() { "user" } else { handle.as_str() };

        self.root.join(format!("{}_{}", handle, id))
    }

    /// Fresh path for an uploaded photo; creates the directory if needed
    pub fn new_original(&self, id: SessionId, username: Option<&str>) -> io::Result<PathBuf> {
        self.fresh_path(id, username, ORIGINAL_DIR)
    }

    /// Encode a redacted image as JPEG into the user's processed directory
    pub fn save_processed(
        &self,
        id: SessionId,
        username: Option<&str>,
        image: &RgbImage,
    ) -> Result<PathBuf> {
        let path = self.fresh_path(id, username, PROCESSED_DIR)?;
        image.save_with_format(&path, ImageFormat::Jpeg)?;
        debug!("saved redacted image to {:?}", path);
        Ok(path)
    }

    /// Remove a transient file; a file that is already gone is fine
    pub fn discard(&self, path: &Path) -> io::Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => {
                debug!("removed {:?}", path);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn fresh_path(&self, id: SessionId, username: Option<&str>, kind: &str) -> io::Result<PathBuf> {
        let dir = self.user_dir(id, username).join(kind);
        if !dir.exists() {
            std::fs::create_dir_all(&dir)?;
            debug!("created directory {:?}", dir);
        }
        Ok(dir.join(format!("{}.jpg", Uuid::new_v4())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());

        let original = workspace.new_original(SessionId(42), Some("alice")).unwrap();
        assert_eq!(original.parent().unwrap(), dir.path().join("alice_42").join("original"));
        assert_eq!(original.extension().unwrap(), "jpg");
        assert!(original.parent().unwrap().is_dir());

        let second = workspace.new_original(SessionId(42), Some("alice")).unwrap();
        assert_ne!(original, second);
    }

    #[test]
    fn test_username_fallback_and_sanitizing() {
        let workspace = Workspace::new("/data");
        assert_eq!(workspace.user_dir(SessionId(1), None), PathBuf::from("/data/user_1"));
        assert_eq!(
            workspace.user_dir(SessionId(2), Some("../etc")),
            PathBuf::from("/data/etc_2")
        );
        assert_eq!(workspace.user_dir(SessionId(3), Some("//")), PathBuf::from("/data/user_3"));
    }

    #[test]
    fn test_save_processed_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let workspace = Workspace::new(dir.path());
        let image = RgbImage::from_pixel(8, 8, image::Rgb([0, 0, 0]));

        let path = workspace.save_processed(SessionId(5), None, &image).unwrap();
        assert!(path.starts_with(dir.path().join("user_5").join("processed")));
        assert_eq!(image::open(&path).unwrap().to_rgb8().dimensions(), (8, 8));

        workspace.discard(&path).unwrap();
        assert!(!path.exists());
        // Second discard is a no-op
        workspace.discard(&path).unwrap();
    }
}
