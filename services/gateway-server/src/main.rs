use clap::Parser;
use gateway_core::GatewayConfig;
use gateway_server::AppState;
use std::env;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
struct Cli {
    /// Path to the gateway's toml config file.
    #[arg(long, default_value = "gateway.toml")]
    config: String,

    /// Overrides `bind_addr` from the config file.
    #[arg(long)]
    bind_addr: Option<String>,
}

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let cli = Cli::parse();
    let mut config = GatewayConfig::load(&cli.config).expect("failed to load gateway config");
    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    let bind_addr = config.bind_addr.clone();

    info!("connecting to redis and kafka...");
    let state = AppState::new(config).await.expect("failed to build gateway state");

    tokio::spawn(state.relay.clone().run(state.sessions.clone()));

    let router = gateway_server::build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.expect("failed to bind");
    info!(addr = %bind_addr, "gateway listening");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
    info!("gateway shut down gracefully");
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
