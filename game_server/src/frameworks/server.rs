// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::http::status_handler;
use crate::interface_adapters::net::{broadcast_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::{GameBroadcast, GameContext, GameEvent, GameSettings, world_task};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc, watch};

/// Loads `.env`, installs the tracing subscriber and routes panics into the log.
pub fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves with settings read from the environment.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, config::game_settings()).await
}

pub async fn serve(listener: tokio::net::TcpListener, settings: GameSettings) -> Result<()> {
    let address = listener.local_addr()?;
    // build state
    let state = build_state(settings);
    // Start the Web Server
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from((config::http_host(), config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

fn build_state(settings: GameSettings) -> Arc<AppState> {
    tracing::debug!(
        round_seconds = settings.timings.round_seconds,
        leaderboard_seconds = settings.timings.leaderboard_seconds,
        scoring = ?settings.scoring,
        "game settings"
    );

    // Setup Channels
    // input_tx/rx: All client events go to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);

    // broadcast_tx: Domain broadcasts from the world task, serialized once below.
    let (broadcast_tx, _broadcast_rx) =
        broadcast::channel::<GameBroadcast>(config::WORLD_BROADCAST_CAPACITY);
    let (frames_tx, _frames_rx) = broadcast::channel(config::WORLD_BROADCAST_CAPACITY);
    let (latest_update_tx, _latest_update_rx) = watch::channel(Utf8Bytes::from(""));

    let game = GameContext::new(settings, StdRng::from_entropy());
    let (round_tx, _round_rx) = watch::channel(game.summary());

    let state = Arc::new(AppState {
        input_tx,
        broadcast_tx,
        frames_tx,
        latest_update_tx,
        round_tx,
        join_timeout: config::join_timeout(),
    });

    // Spawn the Game Loop (World Task)
    tokio::spawn(world_task(
        input_rx,
        state.broadcast_tx.clone(),
        state.round_tx.clone(),
        game,
    ));

    // Subscribe here, before returning, so the serializer never misses early broadcasts.
    tokio::spawn(broadcast_serializer(
        state.broadcast_tx.subscribe(),
        state.frames_tx.clone(),
        state.latest_update_tx.clone(),
    ));

    state
}
