//! EntryDecisionSystem - Analysis + Audit
//!
//! ## Responsibilities
//!
//! - Run the vehicle analyzer and log every automated decision once
//! - Fall back to REVIEW when the analyzer fails
//! - Record operator overrides as independent entries

use crate::entry_log::{EntryLog, LogEntry};
use crate::error::{Error, Result};
use crate::models::{AnalysisResult, Decision};
use crate::vehicle_analyzer::VehicleAnalyzer;
use std::path::Path;
use std::sync::Arc;

/// EntryDecisionSystem instance
pub struct EntryDecisionSystem {
    analyzer: Arc<VehicleAnalyzer>,
    log: Arc<EntryLog>,
}

impl EntryDecisionSystem {
    pub fn new(analyzer: Arc<VehicleAnalyzer>, log: Arc<EntryLog>) -> Self {
        Self { analyzer, log }
    }

    /// Analyze a vehicle and log the outcome before returning it.
    ///
    /// Analyzer failures become a logged REVIEW decision; only log
    /// failures are returned as errors.
    pub async fn process_vehicle(&self, image_path: &Path) -> Result<AnalysisResult> {
        let result = match self.analyzer.analyze(image_path).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(
                    image = %image_path.display(),
                    error = %e,
                    "Automated analysis failed, routing vehicle to review"
                );
                fallback_result(&e)
            }
        };

        self.log
            .append(&LogEntry::automated(image_path.display().to_string(), &result))
            .await?;

        Ok(result)
    }

    /// Record an operator decision. Prior entries are neither read nor changed.
    pub async fn override_decision(
        &self,
        image_path: &str,
        new_decision: Decision,
        reason: &str,
        operator_id: &str,
    ) -> Result<Decision> {
        if operator_id.trim().is_empty() {
            return Err(Error::Validation("operator_id is required".to_string()));
        }

        let entry = LogEntry::manual_override(image_path, new_decision, reason, operator_id);
        self.log.append(&entry).await?;

        tracing::info!(
            image = %image_path,
            decision = %new_decision,
            operator_id = %operator_id,
            "Manual override recorded"
        );

        Ok(new_decision)
    }

    /// Most recent audit entries, newest first
    pub async fn recent_entries(&self, limit: usize) -> Result<Vec<LogEntry>> {
        self.log.recent(limit).await
    }
}

fn fallback_result(error: &Error) -> AnalysisResult {
    AnalysisResult::now(
        format!("Automated analysis unavailable: {}", error),
        Decision::Review,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vehicle_analyzer::{VisionModel, VisionPrompt};
    use futures::future::BoxFuture;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Reply(std::result::Result<&'static str, &'static str>);

    impl VisionModel for Reply {
        fn complete(&self, _prompt: VisionPrompt) -> BoxFuture<'_, Result<String>> {
            let reply = self
                .0
                .map(str::to_string)
                .map_err(|e| Error::Api(e.to_string()));
            Box::pin(async move { reply })
        }
    }

    async fn build(
        dir: &TempDir,
        reply: std::result::Result<&'static str, &'static str>,
    ) -> (EntryDecisionSystem, Arc<EntryLog>) {
        let log = Arc::new(EntryLog::new(dir.path().join("entries.log")).await.unwrap());
        let analyzer = Arc::new(VehicleAnalyzer::new(
            Arc::new(Reply(reply)),
            Duration::from_secs(5),
        ));
        (EntryDecisionSystem::new(analyzer, log.clone()), log)
    }

    async fn image(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("vehicle_20250101_120000.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();
        path
    }

    #[tokio::test]
    async fn test_process_logs_exactly_once() {
        let dir = TempDir::new().unwrap();
        let (system, log) = build(&dir, Ok("The vehicle has a roof rack, so it is not allowed.")).await;
        let path = image(&dir).await;

        let result = system.process_vehicle(&path).await.unwrap();
        assert_eq!(result.decision, Decision::Deny);

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, Decision::Deny);
        assert_eq!(entries[0].image, path.display().to_string());
        assert_eq!(entries[0].analysis, result.analysis);
        assert!((entries[0].timestamp - result.timestamp).abs() < 1e-3);
        assert!(!entries[0].is_override());
    }

    #[tokio::test]
    async fn test_analyzer_failure_logs_review() {
        let dir = TempDir::new().unwrap();
        let (system, log) = build(&dir, Err("rate limited")).await;
        let path = image(&dir).await;

        let result = system.process_vehicle(&path).await.unwrap();
        assert_eq!(result.decision, Decision::Review);
        assert!(result.analysis.starts_with("Automated analysis unavailable"));
        assert!(result.analysis.contains("rate limited"));

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, Decision::Review);
    }

    #[tokio::test]
    async fn test_overrides_are_independent_entries() {
        let dir = TempDir::new().unwrap();
        let (system, log) = build(&dir, Ok("Hard to tell without a side view.")).await;
        let path = image(&dir).await;
        let image_name = path.display().to_string();

        system.process_vehicle(&path).await.unwrap();
        let first = system
            .override_decision(&image_name, Decision::Allow, "checked roof manually", "op-1")
            .await
            .unwrap();
        let second = system
            .override_decision(&image_name, Decision::Deny, "soft top spotted", "op-2")
            .await
            .unwrap();
        assert_eq!(first, Decision::Allow);
        assert_eq!(second, Decision::Deny);

        let entries = log.recent(10).await.unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].analysis, "MANUAL OVERRIDE by op-2: soft top spotted");
        assert_eq!(entries[0].decision, Decision::Deny);
        assert!(entries[0].is_override());
        assert_eq!(entries[1].analysis, "MANUAL OVERRIDE by op-1: checked roof manually");
        assert_eq!(entries[1].decision, Decision::Allow);
        assert_eq!(entries[2].decision, Decision::Review);
        assert!(!entries[2].is_override());
    }

    #[tokio::test]
    async fn test_override_requires_operator() {
        let dir = TempDir::new().unwrap();
        let (system, log) = build(&dir, Ok("Yes, fine.")).await;

        let result = system
            .override_decision("x.jpg", Decision::Allow, "ok", "  ")
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(log.recent(10).await.unwrap().is_empty());
    }
}
