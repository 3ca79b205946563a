pub mod core;
pub mod db;
pub mod repositories;
pub mod services;
pub mod tasks;

#[cfg(test)]
mod test_support;

use crate::core::{config::Settings, state::AppState, telemetry};

/// Runs the background worker until a shutdown signal arrives.
pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let storage = services::storage::from_settings(&settings).await?;
    tracing::info!(
        backend = storage.backend(),
        environment = %settings.runtime().environment.as_str(),
        "Object storage ready"
    );

    let state = AppState::new(settings, db_pool, storage);

    tasks::scheduler::run(state).await
}
