//! Camera frames read from a snapshot file
//!
//! An external capture process keeps overwriting a JPEG at a fixed path;
//! each capture reads whatever frame is there right now. Capture helpers
//! running in a browser write a `data:` URL instead, which is decoded.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use super::{CaptureError, FrameSource};
use crate::analysis::EncodedImage;

pub struct SnapshotCamera {
    path: PathBuf,
    active: AtomicBool,
}

impl SnapshotCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            active: AtomicBool::new(false),
        }
    }
}

impl FrameSource for SnapshotCamera {
    fn acquire(&self) -> Result<(), CaptureError> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        if !dir.is_dir() {
            return Err(CaptureError::Unavailable(format!(
                "snapshot directory {} does not exist",
                dir.display()
            )));
        }

        if !self.active.swap(true, Ordering::SeqCst) {
            info!(path = ?self.path, "camera started");
        }
        Ok(())
    }

    fn release(&self) {
        if self.active.swap(false, Ordering::SeqCst) {
            info!("camera stopped");
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn capture_frame(&self) -> Option<EncodedImage> {
        if !self.is_active() {
            return None;
        }

        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => {
                debug!("snapshot is empty");
                None
            }
            Ok(bytes) if bytes.starts_with(b"data:") => {
                let frame = std::str::from_utf8(&bytes).ok().and_then(EncodedImage::from_data_url);
                if frame.is_none() {
                    warn!(path = ?self.path, "snapshot holds an invalid data URL");
                }
                frame
            }
            Ok(bytes) => Some(EncodedImage::jpeg(bytes)),
            Err(e) => {
                warn!(?e, path = ?self.path, "failed to read snapshot");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_fails_without_directory() {
        let camera = SnapshotCamera::new("/nonexistent/wayfinder/frame.jpg");
        assert!(camera.acquire().is_err());
        assert!(!camera.is_active());
    }

    #[test]
    fn test_inactive_camera_yields_no_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        std::fs::write(&path, [0xff, 0xd8, 0xff]).unwrap();

        let camera = SnapshotCamera::new(&path);
        assert!(camera.capture_frame().is_none());
    }

    #[test]
    fn test_capture_reads_latest_frame() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let camera = SnapshotCamera::new(&path);
        camera.acquire().unwrap();

        // Nothing written yet
        assert!(camera.capture_frame().is_none());

        std::fs::write(&path, [0xff, 0xd8, 0x01]).unwrap();
        assert_eq!(camera.capture_frame().unwrap().bytes, vec![0xff, 0xd8, 0x01]);

        std::fs::write(&path, [0xff, 0xd8, 0x02]).unwrap();
        assert_eq!(camera.capture_frame().unwrap().bytes, vec![0xff, 0xd8, 0x02]);
    }

    #[test]
    fn test_capture_decodes_data_url_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.jpg");
        let camera = SnapshotCamera::new(&path);
        camera.acquire().unwrap();

        std::fs::write(&path, "data:image/png;base64,iVBORw0K\n").unwrap();
        let frame = camera.capture_frame().unwrap();
        assert_eq!(frame.mime_type, "image/png");
        assert_eq!(frame.bytes[..4], [0x89, b'P', b'N', b'G']);

        std::fs::write(&path, "data:image/png;base64").unwrap();
        assert!(camera.capture_frame().is_none());
    }

    #[test]
    fn test_release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let camera = SnapshotCamera::new(dir.path().join("frame.jpg"));
        camera.acquire().unwrap();
        camera.release();
        camera.release();
        assert!(!camera.is_active());
    }
}
