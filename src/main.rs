//! Car Wash Gate
//!
//! Main entry point for the gate server.

use carwash_gate::{
    barrier::{BarrierControl, LoggingActuator},
    entry_decision::EntryDecisionSystem,
    entry_log::EntryLog,
    image_source::{FfmpegGrabber, FrameGrabber, ImageSource},
    state::{AppConfig, AppState},
    vehicle_analyzer::{OpenAiVisionClient, VehicleAnalyzer},
    web_api,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carwash_gate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Car Wash Gate v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::from_env();
    tracing::info!(
        vision_model = %config.vision_model,
        openai_base_url = %config.openai_base_url,
        camera_device = ?config.camera_device,
        capture_dir = %config.capture_dir.display(),
        sample_dir = %config.sample_dir.display(),
        entry_log = %config.entry_log_path.display(),
        barrier_port = %config.barrier_port,
        "Configuration loaded"
    );

    if config.openai_api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set - every vehicle will be routed to review");
    }

    // Image source
    let grabber: Option<Arc<dyn FrameGrabber>> = config.camera_device.as_deref().map(|id| {
        Arc::new(FfmpegGrabber::from_camera_id(id, config.camera_timeout)) as Arc<dyn FrameGrabber>
    });
    let samples = ImageSource::discover_samples(&config.sample_dir).await?;
    let image_source = Arc::new(
        ImageSource::new(config.capture_dir.clone(), grabber, samples).await?,
    );
    tracing::info!(
        has_device = image_source.has_device(),
        samples = image_source.sample_count(),
        "ImageSource initialized"
    );

    // Analyzer + audit trail
    let vision = Arc::new(OpenAiVisionClient::new(
        config.openai_base_url.clone(),
        config.openai_api_key.clone(),
        config.vision_model.clone(),
    )?);
    let analyzer = Arc::new(VehicleAnalyzer::new(vision, config.analysis_timeout));
    let entry_log = Arc::new(EntryLog::new(config.entry_log_path.clone()).await?);
    let decision_system = Arc::new(EntryDecisionSystem::new(analyzer, entry_log));
    tracing::info!(
        timeout_sec = config.analysis_timeout.as_secs(),
        "EntryDecisionSystem initialized"
    );

    // Barrier
    let barrier = Arc::new(BarrierControl::new(
        Arc::new(LoggingActuator::new(config.barrier_port.clone())),
        config.barrier_close_delay,
    ));
    tracing::info!(
        close_delay_sec = config.barrier_close_delay.as_secs(),
        "BarrierControl initialized"
    );

    let state = AppState {
        config: config.clone(),
        image_source,
        decision_system,
        barrier: barrier.clone(),
        started_at: Instant::now(),
    };

    let mut app = web_api::create_router(state.clone());
    if let Some(ref static_dir) = config.static_dir {
        let serve_dir = ServeDir::new(static_dir)
            .not_found_service(ServeFile::new(static_dir.join("index.html")));
        app = app.fallback_service(serve_dir);
        tracing::info!(static_dir = %static_dir.display(), "Static file serving enabled");
    }
    let app = app
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    barrier.shutdown().await;
    tracing::info!("Car Wash Gate stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
