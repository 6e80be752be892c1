use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mediarelay_core::{
    create_authenticator, load_config, validate_config, Authenticator, Dispatcher,
    DispatcherServices, FallbackChain, FfmpegEngine, GoogleAnalytics, HttpFetcher, NoopTelemetry,
    SqliteUserStore, Telemetry, Transcoder, UserStore, YtDlpResolver,
};
use mediarelay_server::{api::create_router, state::AppState};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("MEDIARELAY_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    validate_config(&config).context("Configuration validation failed")?;

    info!("Configuration loaded successfully");
    info!("Auth method: {:?}", config.auth.method);
    info!("Database path: {:?}", config.database.path);

    let authenticator: Arc<dyn Authenticator> = Arc::from(
        create_authenticator(&config.auth).context("Failed to create authenticator")?,
    );
    info!("Using authenticator: {}", authenticator.method_name());

    let users: Arc<dyn UserStore> = Arc::new(
        SqliteUserStore::new(&config.database.path).context("Failed to create user store")?,
    );
    info!("User store initialized");

    let telemetry: Arc<dyn Telemetry> = match &config.telemetry.google_token {
        Some(token) if !token.is_empty() => {
            info!("Analytics enabled");
            Arc::new(
                GoogleAnalytics::new(&config.telemetry)
                    .context("Failed to create analytics client")?,
            )
        }
        _ => {
            info!("No analytics token configured");
            Arc::new(NoopTelemetry)
        }
    };

    // Media collaborators
    let engine = Arc::new(FfmpegEngine::new(config.converter.clone()));
    if let Err(e) = engine.validate().await {
        warn!(error = %e, "Media engine not ready, conversions will fail");
    }
    info!(
        ffmpeg = %config.converter.ffmpeg_path.display(),
        max_parallel = config.converter.max_parallel_conversions,
        "Transcoder initialized"
    );
    let fetcher = Arc::new(
        HttpFetcher::new(Duration::from_secs(config.converter.timeout_secs))
            .context("Failed to create HTTP client")?,
    );
    let fallback = FallbackChain::standard(
        config.converter.pdftoppm_path.clone(),
        config.converter.timeout_secs,
    );
    info!(decoders = ?fallback.names(), "Fallback decoders initialized");

    let dispatcher = Arc::new(Dispatcher::new(
        &config,
        DispatcherServices {
            prober: engine.clone(),
            transcoder: engine,
            resolver: Arc::new(YtDlpResolver::new(&config.link)),
            fetcher,
            fallback,
        },
    ));

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        dispatcher,
        users,
        telemetry,
    ));

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
