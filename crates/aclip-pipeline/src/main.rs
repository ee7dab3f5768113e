//! Clip extraction CLI binary.

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use aclip_pipeline::{ClipPipeline, PipelineConfig, StdoutSink};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let Some(url) = std::env::args().nth(1) else {
        eprintln!("Usage: aclip <video-url>");
        std::process::exit(2);
    };

    info!("Starting aclip");

    // Load configuration
    let config = PipelineConfig::from_env();
    info!("Pipeline config: {:?}", config);

    let pipeline = match ClipPipeline::new(config) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to create pipeline: {}", e);
            std::process::exit(1);
        }
    };

    // Setup signal handlers
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        cancel_tx.send(true).ok();
    });

    let pipeline = pipeline.with_shutdown(cancel_rx);

    match pipeline.run(&url, &StdoutSink).await {
        Ok(result) => {
            println!();
            println!("Clip saved to {}", result.video_path.display());
            println!();
            println!("  Title:    {} ({})", result.title, result.duration_label);
            println!("  Channel:  {}", result.channel);
            println!("  Platform: {}", result.platform);
            println!("  Moment:   {}", result.reason);
            println!("  Caption:  {}", result.caption);
            println!("  Hashtags: {}", result.hashtags);
        }
        Err(e) => {
            error!("Clip extraction failed: {}", e);
            std::process::exit(1);
        }
    }
}
