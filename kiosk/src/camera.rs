//! # Replay Camera
//!
//! A [`CaptureDevice`] backed by a directory of PGM frames, served in
//! filename order. This is the kiosk's stand-in for platform camera
//! plumbing: the pipeline neither knows nor cares whether frames come from
//! a sensor or from disk, and a recorded directory makes whole-pipeline
//! runs reproducible.
//!
//! The frame list is snapshotted at `open` time, so a session sees a
//! stable sequence even if the directory changes underneath it. An
//! exhausted replay reports `DeviceFailed` — there is no more footage, and
//! that is not going to change by polling.

use std::path::{Path, PathBuf};
use std::time::Duration;

use aperture_core::capture::{CaptureDevice, CaptureError, Frame, FrameSource};

use crate::pgm;

/// A capture device that replays PGM frames from a directory.
pub struct ReplayCamera {
    dir: PathBuf,
}

impl ReplayCamera {
    /// Points the camera at a frame directory. The directory is read at
    /// `open`, not here, so a missing path surfaces where the session can
    /// handle it.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl CaptureDevice for ReplayCamera {
    fn open(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)
            .map_err(|e| {
                CaptureError::DeviceFailed(format!(
                    "cannot open frame directory {}: {e}",
                    self.dir.display()
                ))
            })?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "pgm"))
            .collect();
        paths.sort();

        tracing::debug!(dir = %self.dir.display(), frames = paths.len(), "replay opened");
        Ok(Box::new(ReplaySource { paths, next: 0 }))
    }
}

struct ReplaySource {
    paths: Vec<PathBuf>,
    next: usize,
}

impl FrameSource for ReplaySource {
    fn next_frame(&mut self, _timeout: Duration) -> Result<Frame, CaptureError> {
        let Some(path) = self.paths.get(self.next) else {
            return Err(CaptureError::DeviceFailed("replay exhausted".to_string()));
        };
        self.next += 1;
        pgm::read_frame(path).map_err(|e| CaptureError::DeviceFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_core::capture::PixelFormat;

    fn write_gray(dir: &Path, name: &str, value: u8) {
        let frame =
            Frame::new(4, 4, PixelFormat::Luma8, vec![value; 16]).unwrap();
        pgm::write_frame(&dir.join(name), &frame).unwrap();
    }

    #[test]
    fn frames_are_served_in_filename_order() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(dir.path(), "002.pgm", 2);
        write_gray(dir.path(), "001.pgm", 1);
        write_gray(dir.path(), "003.pgm", 3);

        let camera = ReplayCamera::new(dir.path());
        let mut source = camera.open().unwrap();
        let timeout = Duration::from_millis(1);

        for expected in [1u8, 2, 3] {
            let frame = source.next_frame(timeout).unwrap();
            assert_eq!(frame.luma(0, 0), expected);
        }
    }

    #[test]
    fn exhausted_replay_is_device_failed() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(dir.path(), "only.pgm", 9);

        let camera = ReplayCamera::new(dir.path());
        let mut source = camera.open().unwrap();
        let timeout = Duration::from_millis(1);

        source.next_frame(timeout).unwrap();
        assert!(matches!(
            source.next_frame(timeout),
            Err(CaptureError::DeviceFailed(_))
        ));
    }

    #[test]
    fn non_pgm_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(dir.path(), "a.pgm", 7);
        std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

        let camera = ReplayCamera::new(dir.path());
        let mut source = camera.open().unwrap();

        assert!(source.next_frame(Duration::from_millis(1)).is_ok());
        assert!(source.next_frame(Duration::from_millis(1)).is_err());
    }

    #[test]
    fn missing_directory_fails_at_open() {
        let camera = ReplayCamera::new("/definitely/not/a/real/dir");
        assert!(matches!(
            camera.open(),
            Err(CaptureError::DeviceFailed(_))
        ));
    }
}
