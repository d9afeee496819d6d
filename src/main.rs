use std::sync::Arc;

use anyhow::Context;

mod app;
mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod models;
mod services;
mod store;

use auth::provider::{AuthProvider, JwtAuthProvider};
use config::{Config, StoreBackend};
use store::{HabitStore, MemoryStore, PgStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub habits: Arc<dyn HabitStore>,
    pub users: Arc<dyn UserStore>,
    pub auth: Arc<dyn AuthProvider>,
}

impl AppState {
    /// Wires one store adapter into both store seams and builds the JWT
    /// auth provider on top of it.
    pub fn new<S>(config: Arc<Config>, store: Arc<S>) -> Self
    where
        S: HabitStore + UserStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let auth = Arc::new(JwtAuthProvider::new(config.clone(), users.clone()));
        Self {
            config,
            habits: store,
            users,
            auth,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "habit_tracker_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env()?);

    let state = match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, data will not survive a restart");
            AppState::new(config.clone(), Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set when STORE_BACKEND=postgres")?;
            let db = db::create_pool(database_url, config.database_max_connections).await?;
            tracing::info!("Database pool ready");
            AppState::new(config.clone(), Arc::new(PgStore::new(db)))
        }
    };

    let app = app::router(state);

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
