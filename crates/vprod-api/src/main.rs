//! Server binary.

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vprod_api::{create_router, metrics, ApiConfig, AppState};
use vprod_pipeline::PipelineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing();

    let config = ApiConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    info!(
        host = %config.host,
        port = config.port,
        projects_root = %pipeline_config.projects_root.display(),
        tts = %pipeline_config.tts_base_url,
        "Starting vprod-api"
    );

    // Artifact roots must exist before the first job lands.
    tokio::fs::create_dir_all(&pipeline_config.projects_root).await?;
    tokio::fs::create_dir_all(&pipeline_config.video_out_dir).await?;

    let metrics_handle = config.metrics_enabled.then(|| {
        info!("Prometheus metrics enabled at /metrics");
        metrics::init_metrics()
    });

    let addr = config.bind_addr()?;
    let state = AppState::new(config, pipeline_config)?;
    let app = create_router(state, metrics_handle);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Env-filtered tracing; JSON lines when `LOG_FORMAT=json`.
fn init_tracing() {
    let env_filter = EnvFilter::from_default_env().add_directive("vprod=info".parse().unwrap());
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
