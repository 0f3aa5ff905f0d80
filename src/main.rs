use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::{mpsc, watch};

use cricket_scorer::cache::{self, FileCache, SnapshotCache};
use cricket_scorer::config::{Config, MirrorMode};
use cricket_scorer::mirror::{Mirror, MirrorTarget, RemoteMirror};
use cricket_scorer::store::EventStore;
use cricket_scorer::types::CricketSignal;
use cricket_scorer::{server, session, signal, state};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.parse().unwrap_or_default()),
        )
        .with_target(false)
        .init();

    let port = config.http_port;

    tracing::info!(
        database = %config.database_path,
        mirror = ?config.mirror_mode,
        cache = %config.cache_path,
        port,
        "cricket-scorer starting"
    );

    let store = Arc::new(
        EventStore::open(&config.database_path)
            .with_context(|| format!("opening store at {}", config.database_path))?,
    );

    let mirror = match config.mirror_mode {
        MirrorMode::Local => Mirror::spawn(MirrorTarget::Local(store.clone())),
        MirrorMode::Remote => Mirror::spawn(MirrorTarget::Remote(RemoteMirror::new(
            &config.mirror_url,
            config.mirror_timeout(),
        )?)),
        MirrorMode::Off => Mirror::disabled(),
    };

    let file_cache: Arc<dyn SnapshotCache> = Arc::new(FileCache::new(&config.cache_path));
    let restored = file_cache.get();
    let (cache_tx, cache_rx) = watch::channel(restored.clone());
    let _writer = cache::spawn_writer(file_cache, cache_rx, config.cache_debounce());

    let signal_stdin = config.signal_stdin;
    let app_state = state::AppState::new(config, store, mirror, cache_tx);

    if let Some(m) = restored {
        tracing::info!(code = %m.id, score = m.score, wickets = m.wickets, "resuming cached match");
        app_state.resume(m);
    }

    if signal_stdin {
        let (signal_tx, signal_rx) = mpsc::channel::<CricketSignal>(64);
        tokio::spawn(signal::run_stdin(signal_tx));
        tokio::spawn(session::run(app_state.clone(), signal_rx));
    }

    let router = server::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("HTTP server listening on 0.0.0.0:{port}");

    axum::serve(listener, router).await?;

    Ok(())
}
