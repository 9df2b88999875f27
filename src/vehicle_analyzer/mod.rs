//! VehicleAnalyzer - Vision Model Adapter
//!
//! ## Responsibilities
//!
//! - Encode the captured image for transport
//! - Ask the vision model whether the vehicle suits the wash
//! - Reduce the reply to ALLOW / DENY / REVIEW
//!
//! The model call is bounded by a timeout. Failures come back as typed
//! errors; no retry, no caching of earlier results.

mod classifier;
mod openai;

pub use classifier::{DecisionClassifier, KeywordClassifier};
pub use openai::OpenAiVisionClient;

use crate::error::{Error, Result};
use crate::models::AnalysisResult;
use base64::Engine;
use futures::future::BoxFuture;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;

/// System instruction sent with every analysis
pub const SYSTEM_PROMPT: &str = "You are a car wash safety and compatibility analyzer.
Assess if vehicles should be allowed into the car wash based on:
1. Size (too tall/wide vehicles not allowed)
2. Modifications (lifted trucks, extra-wide vehicles not allowed)
3. Visible damage or loose parts that might be worsened by washing
4. Convertibles with soft tops (need special handling)
5. Vehicles with roof attachments like bike racks or cargo boxes (not allowed)

Provide a clear YES/NO decision with reasoning.";

/// Per-image user instruction
pub const USER_PROMPT: &str =
    "Analyze this vehicle and determine if it should be allowed into the automatic car wash.";

/// Token budget per analysis
pub const MAX_TOKENS: u32 = 300;

/// One multimodal request
#[derive(Debug, Clone)]
pub struct VisionPrompt {
    pub system: String,
    pub user: String,
    /// `data:<mime>;base64,<bytes>`
    pub image_data_url: String,
    pub max_tokens: u32,
}

/// Hosted multimodal model
pub trait VisionModel: Send + Sync {
    /// Send one prompt, return the reply text
    fn complete(&self, prompt: VisionPrompt) -> BoxFuture<'_, Result<String>>;
}

/// VehicleAnalyzer instance
pub struct VehicleAnalyzer {
    model: Arc<dyn VisionModel>,
    classifier: Arc<dyn DecisionClassifier>,
    timeout: Duration,
}

impl VehicleAnalyzer {
    /// Create analyzer with the keyword classifier
    pub fn new(model: Arc<dyn VisionModel>, timeout: Duration) -> Self {
        Self::with_classifier(model, Arc::new(KeywordClassifier), timeout)
    }

    pub fn with_classifier(
        model: Arc<dyn VisionModel>,
        classifier: Arc<dyn DecisionClassifier>,
        timeout: Duration,
    ) -> Self {
        Self {
            model,
            classifier,
            timeout,
        }
    }

    /// Analyze one vehicle image
    pub async fn analyze(&self, image_path: &Path) -> Result<AnalysisResult> {
        let data = fs::read(image_path).await?;
        let prompt = VisionPrompt {
            system: SYSTEM_PROMPT.to_string(),
            user: USER_PROMPT.to_string(),
            image_data_url: data_url(image_path, &data),
            max_tokens: MAX_TOKENS,
        };

        let started = std::time::Instant::now();
        let analysis = match tokio::time::timeout(self.timeout, self.model.complete(prompt)).await
        {
            Ok(reply) => reply?,
            Err(_) => {
                tracing::warn!(
                    image = %image_path.display(),
                    timeout_sec = self.timeout.as_secs(),
                    "Vision model timeout"
                );
                return Err(Error::AnalysisTimeout(self.timeout.as_secs()));
            }
        };

        let decision = self.classifier.classify(&analysis);

        tracing::info!(
            image = %image_path.display(),
            size = data.len(),
            decision = %decision,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Vehicle analyzed"
        );

        Ok(AnalysisResult::now(analysis, decision))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Inline image as a data URL; MIME from the extension, JPEG otherwise
fn data_url(path: &Path, data: &[u8]) -> String {
    let mime = match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        _ => "image/jpeg",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(data);
    format!("data:{};base64,{}", mime, encoded)
}
