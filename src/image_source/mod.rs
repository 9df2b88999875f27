//! ImageSource - Vehicle Image Capture
//!
//! ## Responsibilities
//!
//! - Still capture from a live device (ffmpeg / V4L2)
//! - Fallback to a rotating set of sample images when no frame is available
//! - Unique, timestamped file names in the capture directory
//!
//! Device failures never reach the caller; they are logged and the
//! sample rotation is used instead.

mod grabber;

pub use grabber::{FfmpegGrabber, FrameGrabber};

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// File extensions accepted as sample images
const SAMPLE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Upper bound on same-second name suffixes before giving up
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// Where a captured image came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// Live capture device
    Device,
    /// Copy of a sample file (index into the rotation)
    Sample(usize),
}

impl CaptureSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureSource::Device => "device",
            CaptureSource::Sample(_) => "sample",
        }
    }
}

/// A still image written to the capture directory
#[derive(Debug, Clone)]
pub struct CapturedImage {
    /// File name inside the capture directory
    pub name: String,
    /// Full path to the file
    pub path: PathBuf,
    pub source: CaptureSource,
    pub captured_at: DateTime<Local>,
}

/// ImageSource instance
pub struct ImageSource {
    capture_dir: PathBuf,
    grabber: Option<Arc<dyn FrameGrabber>>,
    samples: Vec<PathBuf>,
    next_sample: AtomicUsize,
}

impl ImageSource {
    /// Create new ImageSource
    ///
    /// # Arguments
    /// * `capture_dir` - Directory receiving every capture (created if missing)
    /// * `grabber` - Live device, or None to always use samples
    /// * `samples` - Sample rotation, in order
    pub async fn new(
        capture_dir: PathBuf,
        grabber: Option<Arc<dyn FrameGrabber>>,
        samples: Vec<PathBuf>,
    ) -> Result<Self> {
        fs::create_dir_all(&capture_dir).await?;

        Ok(Self {
            capture_dir,
            grabber,
            samples,
            next_sample: AtomicUsize::new(0),
        })
    }

    /// List sample images in a directory, sorted by file name.
    ///
    /// A missing directory yields an empty rotation.
    pub async fn discover_samples(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(sample_dir = %dir.display(), "Sample directory not found");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut samples = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| SAMPLE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_image && entry.file_type().await?.is_file() {
                samples.push(path);
            }
        }
        samples.sort();
        Ok(samples)
    }

    /// Capture a vehicle image.
    ///
    /// Source order:
    /// 1. Live device frame
    /// 2. Next sample in the rotation
    ///
    /// Returns None when neither yields an image.
    pub async fn capture(&self) -> Result<Option<CapturedImage>> {
        if let Some(ref grabber) = self.grabber {
            match grabber.grab().await {
                Ok(data) => {
                    let image = self.store(&data, "jpg", CaptureSource::Device).await?;
                    tracing::debug!(
                        image = %image.name,
                        device = %grabber.label(),
                        size = data.len(),
                        source = "device",
                        "Vehicle image captured from device"
                    );
                    return Ok(Some(image));
                }
                Err(e) => {
                    tracing::warn!(
                        device = %grabber.label(),
                        error = %e,
                        "Device capture failed, falling back to sample images"
                    );
                }
            }
        }

        self.capture_sample().await
    }

    async fn capture_sample(&self) -> Result<Option<CapturedImage>> {
        if self.samples.is_empty() {
            tracing::warn!("No capture device frame and no sample images available");
            return Ok(None);
        }

        // Each sample gets one try per capture; unreadable ones are passed over
        for _ in 0..self.samples.len() {
            let index = self.next_sample.fetch_add(1, Ordering::SeqCst) % self.samples.len();
            let sample = &self.samples[index];

            match fs::read(sample).await {
                Ok(data) => return self.store_sample(index, sample, &data).await.map(Some),
                Err(e) => {
                    tracing::warn!(
                        sample = %sample.display(),
                        error = %e,
                        "Sample image unreadable, trying next"
                    );
                }
            }
        }

        tracing::warn!(samples = self.samples.len(), "No readable sample image");
        Ok(None)
    }

    /// Copy a sample under a fresh name, keeping its extension
    async fn store_sample(&self, index: usize, sample: &Path, data: &[u8]) -> Result<CapturedImage> {
        let ext = sample
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "jpg".to_string());

        let image = self.store(data, &ext, CaptureSource::Sample(index)).await?;
        tracing::debug!(
            image = %image.name,
            sample = %sample.display(),
            sample_index = index,
            source = "sample",
            "Vehicle image taken from sample rotation"
        );
        Ok(image)
    }

    /// Write bytes under a fresh `vehicle_<YYYYMMDD_HHMMSS>` name.
    ///
    /// Same-second captures get `_1`, `_2`, ... suffixes; create_new keeps
    /// concurrent writers from sharing a file.
    async fn store(&self, data: &[u8], ext: &str, source: CaptureSource) -> Result<CapturedImage> {
        let captured_at = Local::now();
        let stem = format!("vehicle_{}", captured_at.format("%Y%m%d_%H%M%S"));

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = if attempt == 0 {
                format!("{}.{}", stem, ext)
            } else {
                format!("{}_{}.{}", stem, attempt, ext)
            };
            let path = self.capture_dir.join(&name);

            let mut file = match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            file.write_all(data).await?;
            file.flush().await?;

            return Ok(CapturedImage {
                name,
                path,
                source,
                captured_at,
            });
        }

        Err(Error::Capture(format!(
            "no free file name for {} after {} attempts",
            stem, MAX_NAME_ATTEMPTS
        )))
    }

    /// Map a capture name back to its path in the capture directory
    pub async fn resolve(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(Error::Validation(format!("Invalid image name: {}", name)));
        }

        let path = self.capture_dir.join(name);
        if !fs::try_exists(&path).await? {
            return Err(Error::NotFound(format!("Image {} not found", name)));
        }
        Ok(path)
    }

    pub fn capture_dir(&self) -> &Path {
        &self.capture_dir
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn has_device(&self) -> bool {
        self.grabber.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::BoxFuture;
    use tempfile::TempDir;

    struct StubGrabber {
        frame: Option<Vec<u8>>,
    }

    impl FrameGrabber for StubGrabber {
        fn grab(&self) -> BoxFuture<'_, Result<Vec<u8>>> {
            let frame = self.frame.clone();
            Box::pin(async move {
                frame.ok_or_else(|| Error::Capture("device unreadable".to_string()))
            })
        }

        fn label(&self) -> String {
            "stub".to_string()
        }
    }

    async fn write_samples(dir: &TempDir) -> Vec<PathBuf> {
        let a = dir.path().join("a.jpg");
        let b = dir.path().join("b.jpg");
        fs::write(&a, b"sample-zero").await.unwrap();
        fs::write(&b, b"sample-one").await.unwrap();
        vec![a, b]
    }

    #[tokio::test]
    async fn test_sample_rotation_wraps() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let samples = write_samples(&samples_dir).await;

        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, samples)
            .await
            .unwrap();

        let mut order = Vec::new();
        let mut contents = Vec::new();
        for _ in 0..3 {
            let image = source.capture().await.unwrap().unwrap();
            match image.source {
                CaptureSource::Sample(i) => order.push(i),
                CaptureSource::Device => panic!("no device configured"),
            }
            contents.push(fs::read(&image.path).await.unwrap());
        }

        assert_eq!(order, vec![0, 1, 0]);
        assert_eq!(contents[0], b"sample-zero");
        assert_eq!(contents[1], b"sample-one");
        assert_eq!(contents[2], b"sample-zero");
    }

    #[tokio::test]
    async fn test_captures_get_distinct_names() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let samples = write_samples(&samples_dir).await;
        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, samples)
            .await
            .unwrap();

        let first = source.capture().await.unwrap().unwrap();
        let second = source.capture().await.unwrap().unwrap();

        assert_ne!(first.name, second.name);
        assert!(first.name.starts_with("vehicle_"));
        assert!(first.name.ends_with(".jpg"));
        assert!(first.path.exists());
        assert!(second.path.exists());
    }

    #[tokio::test]
    async fn test_no_device_no_samples_returns_none() {
        let capture_dir = TempDir::new().unwrap();
        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, Vec::new())
            .await
            .unwrap();

        assert!(source.capture().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_device_frame_preferred() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let samples = write_samples(&samples_dir).await;
        let grabber: Arc<dyn FrameGrabber> = Arc::new(StubGrabber {
            frame: Some(b"live-frame".to_vec()),
        });

        let source = ImageSource::new(capture_dir.path().to_path_buf(), Some(grabber), samples)
            .await
            .unwrap();
        let image = source.capture().await.unwrap().unwrap();

        assert_eq!(image.source, CaptureSource::Device);
        assert_eq!(fs::read(&image.path).await.unwrap(), b"live-frame");
    }

    #[tokio::test]
    async fn test_device_failure_falls_back_to_samples() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let samples = write_samples(&samples_dir).await;
        let grabber: Arc<dyn FrameGrabber> = Arc::new(StubGrabber { frame: None });

        let source = ImageSource::new(capture_dir.path().to_path_buf(), Some(grabber), samples)
            .await
            .unwrap();
        let image = source.capture().await.unwrap().unwrap();

        assert_eq!(image.source, CaptureSource::Sample(0));
    }

    #[tokio::test]
    async fn test_discover_samples_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.png"), b"x").await.unwrap();
        fs::write(dir.path().join("a.JPG"), b"x").await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").await.unwrap();

        let samples = ImageSource::discover_samples(dir.path()).await.unwrap();
        let names: Vec<_> = samples
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.JPG", "b.png"]);

        let missing = ImageSource::discover_samples(&dir.path().join("absent")).await.unwrap();
        assert!(missing.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let capture_dir = TempDir::new().unwrap();
        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, Vec::new())
            .await
            .unwrap();

        assert!(matches!(source.resolve("../etc/passwd").await, Err(Error::Validation(_))));
        assert!(matches!(source.resolve("vehicle_x.jpg").await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_unreadable_sample_skipped() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let mut samples = vec![samples_dir.path().join("gone.jpg")];
        samples.extend(write_samples(&samples_dir).await);

        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, samples)
            .await
            .unwrap();

        let first = source.capture().await.unwrap().unwrap();
        assert_eq!(first.source, CaptureSource::Sample(1));
        assert_eq!(fs::read(&first.path).await.unwrap(), b"sample-zero");

        let second = source.capture().await.unwrap().unwrap();
        assert_eq!(second.source, CaptureSource::Sample(2));
    }

    #[tokio::test]
    async fn test_all_samples_unreadable_returns_none() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let samples = vec![
            samples_dir.path().join("gone-a.jpg"),
            samples_dir.path().join("gone-b.jpg"),
        ];

        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, samples)
            .await
            .unwrap();
        assert!(source.capture().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sample_copy_keeps_extension() {
        let samples_dir = TempDir::new().unwrap();
        let capture_dir = TempDir::new().unwrap();
        let png = samples_dir.path().join("hatchback.PNG");
        fs::write(&png, b"png-bytes").await.unwrap();

        let source = ImageSource::new(capture_dir.path().to_path_buf(), None, vec![png])
            .await
            .unwrap();
        let image = source.capture().await.unwrap().unwrap();

        assert!(image.name.starts_with("vehicle_"));
        assert!(image.name.ends_with(".png"));
    }
}
