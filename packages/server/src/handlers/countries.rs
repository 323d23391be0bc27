//! Country endpoints (read-only reference data).
//!
//! - `GET /api/v1/countries`: paginated list.
//! - `GET /api/v1/countries/{id}`: single country with its region rendered
//!   down to the requested depth.

use axum::{
    extract::{Path, Query, State},
    Json,
};

use terrograph_api::model::CountryModel;
use terrograph_api::page::{DepthParams, Page, PageParams};

use crate::{auth::CurrentUser, error::AppError};

use super::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<CountryModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (countries, total) = state.storage.list_countries(params.offset(), size).await?;
    let models = countries
        .iter()
        .map(|c| state.assembler.country(c, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/countries", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<CountryModel>, AppError> {
    let country = state
        .storage
        .get_country(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("country {id} not found")))?;
    Ok(Json(state.assembler.country(&country, params.effective_depth())))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use tower::ServiceExt;

    use crate::test_support::{authed_app, get, read_json};

    #[tokio::test]
    async fn country_renders_region_at_full_depth() {
        let (app, token) = authed_app().await;
        let resp = app
            .clone()
            .oneshot(get("/api/v1/countries?size=1000", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = read_json(resp).await;
        let iraq = json["content"]
            .as_array()
            .unwrap()
            .iter()
            .find(|c| c["name"] == "Iraq")
            .expect("Iraq is seeded")
            .clone();
        assert_eq!(iraq["region"]["name"], "Middle East & North Africa");

        // depth=0 strips the nested region but keeps the self link
        let id = iraq["id"].as_str().unwrap();
        let resp = app
            .oneshot(get(&format!("/api/v1/countries/{id}?depth=0"), &token))
            .await
            .unwrap();
        let json = read_json(resp).await;
        assert!(json.get("region").is_none());
        assert_eq!(json["links"][0]["rel"], "self");
    }
}
