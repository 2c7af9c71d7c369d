// Still-image capture source
//
// Stands in for a camera by cycling through the images in a directory.
// Only one handle may be live at a time, the same exclusivity a real
// camera device enforces.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

use super::frame::RawFrame;
use super::source::{CaptureDevice, CaptureError, CaptureHandle, CaptureSource};

const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub struct ImageDirSource {
    dir: PathBuf,
    in_use: Arc<AtomicBool>,
}

impl ImageDirSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            in_use: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a handle from this source is currently live
    pub fn is_in_use(&self) -> bool {
        self.in_use.load(Ordering::SeqCst)
    }

    async fn list_frames(&self) -> Result<Vec<PathBuf>, CaptureError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| map_io_error(&self.dir, e))?;

        let mut frames = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| map_io_error(&self.dir, e))?
        {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image {
                frames.push(path);
            }
        }
        frames.sort();

        Ok(frames)
    }
}

#[async_trait::async_trait]
impl CaptureSource for ImageDirSource {
    async fn acquire(&self) -> Result<CaptureHandle, CaptureError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(CaptureError::DeviceUnavailable(format!(
                "{} is busy",
                self.dir.display()
            )));
        }

        let frames = match self.list_frames().await {
            Ok(frames) if !frames.is_empty() => frames,
            Ok(_) => {
                self.in_use.store(false, Ordering::SeqCst);
                return Err(CaptureError::DeviceUnavailable(format!(
                    "no images in {}",
                    self.dir.display()
                )));
            }
            Err(e) => {
                self.in_use.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        info!(
            "Image capture acquired: {} ({} frames)",
            self.dir.display(),
            frames.len()
        );

        let device = ImageDirDevice {
            frames,
            cursor: 0,
            in_use: Arc::clone(&self.in_use),
        };

        Ok(CaptureHandle::new(
            self.dir.display().to_string(),
            Box::new(device),
        ))
    }

    fn name(&self) -> &str {
        "image directory"
    }
}

struct ImageDirDevice {
    frames: Vec<PathBuf>,
    cursor: usize,
    in_use: Arc<AtomicBool>,
}

#[async_trait::async_trait]
impl CaptureDevice for ImageDirDevice {
    async fn current_frame(&mut self) -> Result<Option<RawFrame>, CaptureError> {
        let path = self.frames[self.cursor % self.frames.len()].clone();
        self.cursor = self.cursor.wrapping_add(1);

        // Zero-byte files model a camera that has not produced data yet
        let len = tokio::fs::metadata(&path)
            .await
            .map_err(|e| CaptureError::Frame(format!("{}: {}", path.display(), e)))?
            .len();
        if len == 0 {
            debug!("Frame {} not ready yet", path.display());
            return Ok(None);
        }

        let frame = tokio::task::spawn_blocking(move || decode_frame(&path))
            .await
            .map_err(|e| CaptureError::Frame(format!("decode worker failed: {}", e)))??;

        Ok(Some(frame))
    }

    fn release(&mut self) {
        self.in_use.store(false, Ordering::SeqCst);
        info!("Image capture released");
    }
}

fn decode_frame(path: &Path) -> Result<RawFrame, CaptureError> {
    let image = image::open(path)
        .map_err(|e| CaptureError::Frame(format!("{}: {}", path.display(), e)))?;
    let rgb = image.into_rgb8();
    let (width, height) = rgb.dimensions();

    Ok(RawFrame::new(rgb.into_raw(), width, height))
}

fn map_io_error(dir: &Path, err: std::io::Error) -> CaptureError {
    match err.kind() {
        ErrorKind::PermissionDenied => {
            CaptureError::PermissionDenied(format!("{}: {}", dir.display(), err))
        }
        _ => CaptureError::DeviceUnavailable(format!("{}: {}", dir.display(), err)),
    }
}
