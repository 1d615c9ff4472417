pub mod config;
pub mod db;
pub mod memory;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use songbattle_core::{Catalog, MatchConfig, RatingStore};

use crate::db::SqliteStore;
use crate::state::AppState;

/// Open a SQLite database and create its tables.
pub async fn connect_sqlite(db_url: &str) -> Result<SqliteStore, sqlx::Error> {
    let options = if db_url.contains(":memory:") {
        // Every connection to an in-memory database sees its own empty database.
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };
    let pool = options.connect(db_url).await?;

    db::init_db(&pool).await?;
    Ok(SqliteStore::new(pool))
}

/// Build a fully configured Router + shared state.
pub async fn build_app<S>(
    store: S,
    catalog: Catalog,
    config: MatchConfig,
) -> songbattle_core::Result<(Router, Arc<AppState<S>>)>
where
    S: RatingStore + 'static,
{
    store.register_songs(&catalog.ids()).await?;
    info!(songs = catalog.len(), "catalog registered");

    let state = Arc::new(AppState::new(store, catalog, config));

    {
        let state = state.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(60));
            loop {
                interval.tick().await;
                let pruned = state.prune_session_locks();
                if pruned > 0 {
                    debug!(pruned, "dropped idle session locks");
                }
            }
        });
    }

    let app = Router::new()
        .route("/health", get(routes::health))
        .route("/battle", get(routes::battle::<S>))
        .route("/outcome", post(routes::record_outcome::<S>))
        .route("/leaderboard", get(routes::leaderboard::<S>))
        .route("/rankings/{session}", get(routes::personal_rankings::<S>))
        .route("/affinity/{session}", get(routes::affinity::<S>))
        .route("/songs/{id}", get(routes::song::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    Ok((app, state))
}
