//! Application state
//!
//! Holds all shared components and configuration

use crate::barrier::BarrierControl;
use crate::entry_decision::EntryDecisionSystem;
use crate::image_source::ImageSource;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Vision model API key
    pub openai_api_key: Option<String>,
    /// Vision model API base URL (OpenAI compatible)
    pub openai_base_url: String,
    /// Vision model name
    pub vision_model: String,
    /// Upper bound on one analysis call
    pub analysis_timeout: Duration,
    /// Camera identifier ("0" -> /dev/video0); None disables the device
    pub camera_device: Option<String>,
    /// Device read timeout
    pub camera_timeout: Duration,
    /// Directory receiving every captured image
    pub capture_dir: PathBuf,
    /// Sample images used when the device yields nothing
    pub sample_dir: PathBuf,
    /// Append-only audit log
    pub entry_log_path: PathBuf,
    /// Barrier controller port
    pub barrier_port: String,
    /// Delay before the barrier closes itself
    pub barrier_close_delay: Duration,
    /// Static frontend directory (optional)
    pub static_dir: Option<PathBuf>,
}

impl AppConfig {
    /// Load from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT").unwrap_or(5000),
            openai_api_key: std::env::var("OPENAI_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            openai_base_url: std::env::var("OPENAI_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            vision_model: std::env::var("VISION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
            analysis_timeout: Duration::from_secs(env_parse("ANALYSIS_TIMEOUT_SEC").unwrap_or(30)),
            camera_device: parse_camera_device(
                std::env::var("CAMERA_DEVICE").ok().as_deref(),
            ),
            camera_timeout: Duration::from_secs(env_parse("CAMERA_TIMEOUT_SEC").unwrap_or(5)),
            capture_dir: std::env::var("CAPTURE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./captured_images")),
            sample_dir: std::env::var("SAMPLE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./sample_images")),
            entry_log_path: std::env::var("ENTRY_LOG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("car_wash_entries.log")),
            barrier_port: std::env::var("BARRIER_PORT")
                .unwrap_or_else(|_| "/dev/ttyUSB0".to_string()),
            barrier_close_delay: Duration::from_secs(
                env_parse("BARRIER_CLOSE_DELAY_SEC").unwrap_or(10),
            ),
            static_dir: std::env::var("STATIC_DIR").ok().map(PathBuf::from),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Unset means camera 0; "none"/"off"/empty disables the device
fn parse_camera_device(value: Option<&str>) -> Option<String> {
    match value.map(str::trim) {
        None => Some("0".to_string()),
        Some(v) if v.is_empty() || v.eq_ignore_ascii_case("none") || v.eq_ignore_ascii_case("off") => {
            None
        }
        Some(v) => Some(v.to_string()),
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application config
    pub config: AppConfig,
    /// ImageSource (device / sample rotation)
    pub image_source: Arc<ImageSource>,
    /// EntryDecisionSystem (analysis + audit log)
    pub decision_system: Arc<EntryDecisionSystem>,
    /// BarrierControl
    pub barrier: Arc<BarrierControl>,
    /// Process start, for uptime
    pub started_at: Instant,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camera_device_parsing() {
        assert_eq!(parse_camera_device(None), Some("0".to_string()));
        assert_eq!(parse_camera_device(Some("2")), Some("2".to_string()));
        assert_eq!(
            parse_camera_device(Some("/dev/video1")),
            Some("/dev/video1".to_string())
        );
        assert_eq!(parse_camera_device(Some("none")), None);
        assert_eq!(parse_camera_device(Some("OFF")), None);
        assert_eq!(parse_camera_device(Some("")), None);
    }
}
