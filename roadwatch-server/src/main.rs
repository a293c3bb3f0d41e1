// Roadwatch - pothole detection web service
// Upload a road photo or clip, get it back with every pothole outlined

use anyhow::Context;
use clap::Parser;
use roadwatch_core::AppConfig;
use roadwatch_eye::{Detector, YoloSeg};
use roadwatch_server::http::{create_router, ApiState};
use roadwatch_server::metrics::Metrics;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "roadwatch-server", about = "Pothole detection web service", version)]
struct Args {
    /// Configuration file (JSON or TOML)
    #[arg(long, short = 'c')]
    config: Option<String>,

    /// Override the configured listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    // Initialize logging
    let level: tracing::Level = config
        .server
        .log_level
        .parse()
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    info!("🚀 Starting Roadwatch...");

    // Prepare media directories
    info!("📁 Preparing media directories...");
    initialize_directories(&config).await?;
    info!("✅ Upload and output directories ready");

    // Load the segmentation model
    info!("🧠 Loading detection model from {}...", config.model.path);
    let detector = initialize_detector(&config)?;
    info!(
        "✅ Model ready ({} classes: {})",
        detector.class_names().len(),
        detector.class_names().join(", ")
    );

    // Metrics
    let metrics = Arc::new(Metrics::new());

    // Start HTTP server
    info!(
        "🌐 Starting HTTP server on {}:{}...",
        config.server.host, config.server.port
    );
    let state = ApiState {
        config: Arc::new(config.clone()),
        detector,
        metrics,
        started_at: chrono::Utc::now(),
    };
    let http_server = start_http_server(&config, state).await?;
    info!(
        "✅ HTTP server ready on http://{}:{}",
        config.server.host, config.server.port
    );

    print_ready_message(&config);

    info!("🎯 Roadwatch is ready! Press Ctrl+C to stop.");
    wait_for_shutdown().await;

    info!("🛑 Shutting down Roadwatch...");
    http_server.abort();

    info!("👋 Roadwatch stopped. Goodbye!");
    Ok(())
}

/// Resolve configuration from file, environment and CLI overrides
fn load_config(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AppConfig::default(),
    };
    config.apply_env();

    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;
    Ok(config)
}

/// Create the upload and output directories if they are missing
async fn initialize_directories(config: &AppConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(&config.paths.upload_dir).await?;
    tokio::fs::create_dir_all(&config.paths.output_dir).await?;
    Ok(())
}

/// Check the model artifact and load it
fn initialize_detector(config: &AppConfig) -> anyhow::Result<Arc<dyn Detector>> {
    if !std::path::Path::new(&config.model.path).exists() {
        anyhow::bail!(
            "Model file '{}' not found. Export the segmentation model to ONNX and place it there, or point model.path at it.",
            config.model.path
        );
    }

    let model = YoloSeg::new(&config.model)
        .map_err(|e| anyhow::anyhow!("Failed to load model: {}", e))?;
    Ok(Arc::new(model))
}

/// Bind the listener and serve the API in a background task
async fn start_http_server(
    config: &AppConfig,
    state: ApiState,
) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let app = create_router(state);
    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("HTTP server failed");
    });

    Ok(server)
}

/// Print ready message
fn print_ready_message(config: &AppConfig) {
    println!();
    println!("╔═══════════════════════════════════════════════════════════════╗");
    println!("║                                                               ║");
    println!("║     ✅  ROADWATCH IS READY!  ✅                              ║");
    println!("║                                                               ║");
    println!("║     🌐 Web UI:    http://localhost:{}                       ║", config.server.port);
    println!("║     📤 Uploads:   {}                                          ║", config.paths.upload_dir);
    println!("║     📥 Outputs:   {}                                          ║", config.paths.output_dir);
    println!("║     🧠 Model:     {}                                          ║", config.model.path);
    println!("║                                                               ║");
    println!("║     🕳️  Ready to find potholes!                               ║");
    println!("║                                                               ║");
    println!("╚═══════════════════════════════════════════════════════════════╝");
    println!();
}

/// Wait for shutdown signal
async fn wait_for_shutdown() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("🛑 Shutdown signal received");
}
