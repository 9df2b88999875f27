//! Frame grabbers - live capture devices

use crate::error::{Error, Result};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// A live capture device that can produce one still frame
pub trait FrameGrabber: Send + Sync {
    /// Grab one frame as encoded image bytes
    fn grab(&self) -> BoxFuture<'_, Result<Vec<u8>>>;

    /// Human-readable device label for diagnostics
    fn label(&self) -> String;
}

/// V4L2 camera read through ffmpeg
pub struct FfmpegGrabber {
    device: PathBuf,
    width: u32,
    height: u32,
    timeout: Duration,
}

impl FfmpegGrabber {
    /// Create a grabber for a device path (e.g. /dev/video0)
    pub fn new(device: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            device: device.into(),
            width: 1920,
            height: 1080,
            timeout,
        }
    }

    /// Map a camera identifier to a device path.
    ///
    /// A bare index like "0" becomes /dev/video0; anything else is used as a path.
    pub fn from_camera_id(camera_id: &str, timeout: Duration) -> Self {
        let device = match camera_id.parse::<u32>() {
            Ok(index) => PathBuf::from(format!("/dev/video{}", index)),
            Err(_) => PathBuf::from(camera_id),
        };
        Self::new(device, timeout)
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    async fn capture_frame(&self) -> Result<Vec<u8>> {
        if !self.device.exists() {
            return Err(Error::Capture(format!(
                "capture device {} not present",
                self.device.display()
            )));
        }

        let video_size = format!("{}x{}", self.width, self.height);
        let device = self.device.to_string_lossy().into_owned();

        // Child is dropped on timeout; kill_on_drop reaps the ffmpeg process
        let child = Command::new("ffmpeg")
            .args([
                "-f", "v4l2",
                "-video_size", &video_size,
                "-i", &device,
                "-frames:v", "1",
                "-f", "image2pipe",
                "-vcodec", "mjpeg",
                "-loglevel", "error",
                "-y",
                "-",
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Capture(format!("ffmpeg spawn failed: {}", e)))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(Error::Capture(format!("ffmpeg failed: {}", stderr.trim())));
                }
                if output.stdout.is_empty() {
                    return Err(Error::Capture("ffmpeg returned empty frame".to_string()));
                }
                Ok(output.stdout)
            }
            Ok(Err(e)) => Err(Error::Capture(format!("ffmpeg execution failed: {}", e))),
            Err(_) => Err(Error::Capture(format!(
                "ffmpeg timeout ({}s)",
                self.timeout.as_secs()
            ))),
        }
    }
}

impl FrameGrabber for FfmpegGrabber {
    fn grab(&self) -> BoxFuture<'_, Result<Vec<u8>>> {
        Box::pin(self.capture_frame())
    }

    fn label(&self) -> String {
        self.device.display().to_string()
    }
}
