//! CRM Coordinator server binary, grounded in the teacher's
//! `orchestrator-server` binary's tracing/listen/graceful-shutdown shape.

use std::net::SocketAddr;

use tooling::config::ConfigBuilder;

use crm_server::config::ServerConfig;
use crm_server::routes::create_router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(rust_log).init();

    tracing::info!("[SERVER:STARTUP] loading configuration");
    let config = ServerConfig::from_env_with_defaults("")?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("[SERVER:STARTUP] building application state");
    let state = crm_server::build_app_state(config).await?;

    let app = create_router(state);

    tracing::info!(%addr, "[SERVER:STARTUP] listening");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    axum::serve(listener, app.into_make_service()).with_graceful_shutdown(shutdown_signal()).await?;

    tracing::info!("[SERVER:SHUTDOWN] shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install CTRL-C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { tracing::info!("[SERVER:SHUTDOWN] received CTRL-C"); }
        _ = terminate => { tracing::info!("[SERVER:SHUTDOWN] received SIGTERM"); }
    }
}
