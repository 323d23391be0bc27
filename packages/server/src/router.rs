//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::Config,
    handlers::{
        auth, cities, countries, events, groups, provinces, regions, targets, victims, AppState,
    },
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(storage: Arc<dyn Storage>, config: Config) -> Router {
    let state = AppState::new(storage, config);

    Router::new()
        // Accounts (the only endpoints that skip the bearer-token check)
        .route("/api/v1/registration", post(auth::register))
        .route("/api/v1/authentication", post(auth::authenticate))
        // Reference data (read-only)
        .route("/api/v1/regions", get(regions::list))
        .route("/api/v1/regions/{id}", get(regions::get_by_id))
        .route("/api/v1/countries", get(countries::list))
        .route("/api/v1/countries/{id}", get(countries::get_by_id))
        // Provinces
        .route(
            "/api/v1/provinces",
            get(provinces::list).post(provinces::create),
        )
        .route(
            "/api/v1/provinces/{id}",
            get(provinces::get_by_id)
                .put(provinces::update)
                .patch(provinces::patch)
                .delete(provinces::remove),
        )
        // Cities
        .route("/api/v1/cities", get(cities::list).post(cities::create))
        .route(
            "/api/v1/cities/{id}",
            get(cities::get_by_id)
                .put(cities::update)
                .patch(cities::patch)
                .delete(cities::remove),
        )
        // Targets
        .route("/api/v1/targets", get(targets::list).post(targets::create))
        .route(
            "/api/v1/targets/{id}",
            get(targets::get_by_id)
                .put(targets::update)
                .patch(targets::patch)
                .delete(targets::remove),
        )
        // Victims
        .route("/api/v1/victims", get(victims::list).post(victims::create))
        .route(
            "/api/v1/victims/{id}",
            get(victims::get_by_id)
                .put(victims::update)
                .patch(victims::patch)
                .delete(victims::remove),
        )
        // Events and their target sub-resource
        .route("/api/v1/events", get(events::list).post(events::create))
        .route(
            "/api/v1/events/{id}",
            get(events::get_by_id)
                .put(events::update)
                .patch(events::patch)
                .delete(events::remove),
        )
        .route(
            "/api/v1/events/{id}/targets",
            get(events::get_target)
                .put(events::put_target)
                .delete(events::delete_target),
        )
        // Groups and their events sub-resource
        .route("/api/v1/groups", get(groups::list).post(groups::create))
        .route(
            "/api/v1/groups/{id}",
            get(groups::get_by_id)
                .put(groups::update)
                .patch(groups::patch)
                .delete(groups::remove),
        )
        .route(
            "/api/v1/groups/{id}/events",
            get(groups::list_events)
                .post(groups::add_event)
                .delete(groups::delete_events),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
