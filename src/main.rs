//! Territory Arena Server - headless authoritative simulation
//!
//! Runs a match over the in-memory host at a fixed tick rate and exposes
//! its status over HTTP:
//! - `/health` liveness
//! - `/status` phase, clock and team scores

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::time::{interval, MissedTickBehavior};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use territory_arena_server::app::AppState;
use territory_arena_server::config::Config;
use territory_arena_server::http::build_router;
use territory_arena_server::sim::Simulation;
use territory_arena_server::util::time::{
    init_server_time, unix_millis, SimClock, SIMULATION_TPS, TICK_DURATION_MILLIS,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level, config.json_logs);

    // Initialize server time tracking
    init_server_time();

    let game_config = config.game_config()?;
    let seed = config.seed.unwrap_or_else(unix_millis);

    info!("Starting Territory Arena Server");
    info!("Server address: {}", config.server_addr);
    info!(
        seed,
        players = config.sim_players,
        bots_per_team = game_config.bots.per_team,
        "Simulation configured"
    );

    let state = AppState::new(config.clone());

    // Simulation loop
    let sim_state = state.clone();
    let players = config.sim_players;
    tokio::spawn(async move {
        let mut sim = Simulation::new(game_config, seed, players);
        let clock = SimClock::new();
        let mut ticker = interval(Duration::from_millis(TICK_DURATION_MILLIS));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            sim.step(clock.now_ms());
            if sim.ticks() % u64::from(SIMULATION_TPS) == 0 {
                sim_state.publish(sim.snapshot());
            }
        }
    });

    // Build router
    let router = build_router(state);

    // Start server
    let addr: SocketAddr = config.server_addr;
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on {}", addr);
    info!("Health check: http://{}/health", addr);
    info!("Match status: http://{}/status", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str, json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer().json().with_target(true).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
