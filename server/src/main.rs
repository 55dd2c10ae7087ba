use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tower::Layer;
use tracing::{error, info};

use server::handlers::http::routes::{RouterService, build_router};
use server::state::AppState;
use server::tower_middle::RequestLoggerLayer;

use shared::config::config::load_config;

#[derive(Parser, Debug)]
#[command(name = "umkm-server", about = "Si-UMKM request security pipeline")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let args = Args::parse();
    let config = load_config(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    let addr = config.server.addr();
    let cleanup_interval = config.security.cleanup_interval();
    let state = AppState::new(config);

    // Periodic CSRF sweep so expired tokens don't only die lazily on
    // their next verification.
    let csrf = state.csrf.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        ticker.tick().await; // first tick completes immediately
        loop {
            ticker.tick().await;
            csrf.cleanup().await;
        }
    });

    let router = Arc::new(build_router());

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);

    // Accepts stall once max_connections tasks are in flight; each permit
    // is released when its connection task finishes.
    let limiter = Arc::new(Semaphore::new(state.config.server.max_connections));

    loop {
        let permit = limiter
            .clone()
            .acquire_owned()
            .await
            .context("Connection limiter closed")?;
        let (stream, peer) = listener
            .accept()
            .await
            .context("Failed to accept connection")?;
        let io = TokioIo::new(stream);

        let service = RequestLoggerLayer::new(state.logs.clone())
            .layer(RouterService::new(router.clone(), state.clone()));

        tokio::task::spawn(async move {
            if let Err(err) = http1::Builder::new()
                .timer(TokioTimer::new())
                .serve_connection(io, TowerToHyperService::new(service))
                .await
            {
                error!("Error serving connection from {}: {:?}", peer, err);
            }
            drop(permit);
        });
    }
}
