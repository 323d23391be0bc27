//! `terrograph-server`: the terrograph record API.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory server on the default port:
//! terrograph-server
//!
//! # Persistent SQLite server:
//! TGRAPH_DB=./records.db terrograph-server
//!
//! # Custom bind address and token secret:
//! TGRAPH_BIND=0.0.0.0:8080 TGRAPH_JWT_SECRET=... terrograph-server
//! ```
//!
//! # Environment variables
//!
//! See [`Config::from_env`] for the full list.

use std::sync::Arc;

use terrograph_server::{
    build_router, seed, Config, MemoryStorage, SqliteStorage, Storage,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "terrograph_server=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env();

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => {
            tracing::info!("storage: SQLite at {path}");
            Arc::new(
                SqliteStorage::open(path)
                    .unwrap_or_else(|e| panic!("failed to open SQLite database at {path}: {e}")),
            )
        }
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    seed::run(&storage)
        .await
        .unwrap_or_else(|e| panic!("failed to seed reference data: {e}"));

    let app = build_router(storage, config.clone());

    tracing::info!("listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {}: {e}", config.bind_addr));

    axum::serve(listener, app)
        .await
        .expect("server error");
}
