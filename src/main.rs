mod config;
mod db;
mod error;
mod model;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use services::email::{Mailer, ResendMailer};
use services::local_cache::LocalCache;
use services::repository::Repository;
use services::store::{MemoryRecordStore, PgRecordStore, RecordStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = config::AppConfig::from_env().expect("invalid configuration");

    let store: Arc<dyn RecordStore> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgRecordStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; records are kept in memory only");
            Arc::new(MemoryRecordStore::new())
        }
    };

    let cache = config
        .flags
        .offline_cache
        .then(|| LocalCache::new(config.cache_dir.clone()));
    let mailer = config
        .resend_api_key
        .as_deref()
        .map(|key| Arc::new(ResendMailer::new(key, &config.resend_from)) as Arc<dyn Mailer>);
    if mailer.is_none() {
        tracing::info!("RESEND_API_KEY not set; census email disabled");
    }

    let state = state::AppState::new(Repository::new(store, cache), mailer, config.flags);

    // Background push of offline edits.
    let _sync = services::sync::spawn_sync_task(state.clone(), config.sync_interval_ms);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "ward census listening");
    axum::serve(listener, app).await.expect("server failed");
}
