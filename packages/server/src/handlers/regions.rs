//! Region endpoints (read-only reference data).
//!
//! - `GET /api/v1/regions`: paginated list.
//! - `GET /api/v1/regions/{id}`: single region.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use terrograph_api::model::RegionModel;
use terrograph_api::page::{Page, PageParams};

use crate::{auth::CurrentUser, error::AppError};

use super::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<RegionModel>>, AppError> {
    let size = params.effective_size();
    let (regions, total) = state.storage.list_regions(params.offset(), size).await?;
    let models = regions.iter().map(|r| state.assembler.region(r)).collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/regions", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<Json<RegionModel>, AppError> {
    let region = state
        .storage
        .get_region(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("region {id} not found")))?;
    Ok(Json(state.assembler.region(&region)))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use crate::test_support::{authed_app, bearer};

    #[tokio::test]
    async fn listing_requires_a_token() {
        let (app, _token) = authed_app().await;
        let req = Request::builder()
            .uri("/api/v1/regions")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn seeded_regions_are_listed_with_links() {
        let (app, token) = authed_app().await;
        let req = Request::builder()
            .uri("/api/v1/regions?size=3")
            .header("authorization", bearer(&token))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = resp.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["page"]["size"], 3);
        assert_eq!(json["content"].as_array().unwrap().len(), 3);
        assert_eq!(json["content"][0]["links"][0]["rel"], "self");
        assert!(json["page"]["total_elements"].as_u64().unwrap() >= 10);
    }

    #[tokio::test]
    async fn unknown_region_is_404() {
        let (app, token) = authed_app().await;
        let req = Request::builder()
            .uri("/api/v1/regions/no-such-id")
            .header("authorization", bearer(&token))
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
