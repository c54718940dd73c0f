mod analysis;
mod config;
mod errors;
mod models;
mod server;
mod state;

use crate::state::AppState;

#[tokio::main]
async fn main() {
    // Structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("stockr pricing service starting");

    // Load config
    let cfg = match config::AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            tracing::error!("config error: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!(
        steps = cfg.lattice.steps,
        american = cfg.lattice.american,
        dividend_yield = cfg.lattice.dividend_yield,
        jump_intensity = cfg.jump.intensity_per_year,
        jump_mean = cfg.jump.mean_jump_log_return,
        jump_vol = cfg.jump.jump_volatility,
        "pricing models configured"
    );

    let port = cfg.server_port;
    let app = server::router(AppState::new(cfg));

    let addr = format!("0.0.0.0:{port}");
    tracing::info!("server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("bind error: {e}");
            std::process::exit(1);
        });

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
    }
}
