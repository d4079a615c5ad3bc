//! Visual DM Engine - Main entry point.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use visualdm_engine::infrastructure::{
    persistence::JsonFactionSnapshotStore, settings::EngineSettings,
};
use visualdm_engine::App;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from repo root.
    load_dotenv_from_repo_root();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "visualdm_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Visual DM Engine");

    let settings = EngineSettings::load()?;
    let snapshots = Arc::new(JsonFactionSnapshotStore::new(settings.snapshot_path.clone()));
    let app = App::new(&settings, snapshots)?;

    let count = app.restore_factions().await?;
    tracing::info!(factions = count, "Factions ready");

    let cancel_token = CancellationToken::new();
    let worker = tokio::spawn(app.decay_worker(&settings).run(cancel_token.clone()));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    cancel_token.cancel();
    if let Err(e) = worker.await {
        tracing::warn!(error = %e, "Tension decay worker ended abnormally");
    }

    app.save_factions().await?;
    tracing::info!("Visual DM Engine stopped");
    Ok(())
}

fn load_dotenv_from_repo_root() {
    let repo_root = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..");

    // Prefer local overrides.
    for filename in [".env.local", ".env"] {
        let path = repo_root.join(filename);
        if path.exists() {
            let _ = dotenvy::from_path(path);
        }
    }
}
