//! City endpoints: list, get, create, replace, patch, delete.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use terrograph_api::dto::CityDto;
use terrograph_api::model::CityModel;
use terrograph_api::page::{DepthParams, Page, PageParams, MAX_DEPTH};

use crate::{auth::CurrentUser, error::AppError};

use super::{city_country_refs, validate_against_countries, AppState};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<CityModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (cities, total) = state.storage.list_cities(params.offset(), size).await?;
    let models = cities
        .iter()
        .map(|c| state.assembler.city(c, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/cities", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<CityModel>, AppError> {
    let city = state
        .storage
        .get_city(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("city {id} not found")))?;
    Ok(Json(state.assembler.city(&city, params.effective_depth())))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(dto): Json<CityDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, city_country_refs("", &dto)).await?;
    let node = dto.try_into_node()?;
    let saved = state.storage.save_city(&node).await?;
    let model = state.assembler.city(&saved, MAX_DEPTH);
    let location = model
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(model),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    Json(dto): Json<CityDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, city_country_refs("", &dto)).await?;
    let mut node = dto.try_into_node()?;
    let existed = state.storage.get_city(&id).await?.is_some();
    node.id = id;
    let saved = state.storage.save_city(&node).await?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.city(&saved, MAX_DEPTH))))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    doc: super::patching::PatchDocument,
) -> Result<Json<CityModel>, AppError> {
    let node = state
        .storage
        .get_city(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("city {id} not found")))?;

    let patched = doc.apply(&node)?;
    if patched.id != node.id {
        return Err(AppError::BadRequest("id is immutable and cannot be patched".into()));
    }

    let dto = CityDto::from_node(&patched);
    validate_against_countries(&state, &dto, city_country_refs("", &dto)).await?;

    let saved = state.storage.save_city(&patched).await?;
    Ok(Json(state.assembler.city(&saved, MAX_DEPTH)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_city(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("city {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{authed_app, patch_json, post_json, read_json};

    fn city_body() -> serde_json::Value {
        json!({
            "name": "Mosul",
            "latitude": 36.34,
            "longitude": 43.13,
            "province": { "name": "Nineveh", "country": { "name": "Iraq" } }
        })
    }

    #[tokio::test]
    async fn create_renders_the_full_chain() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json("/api/v1/cities", Some(&token), city_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = read_json(resp).await;
        assert_eq!(body["province"]["country"]["region"]["name"], "Middle East & North Africa");
    }

    #[tokio::test]
    async fn coordinate_violations_aggregate_with_nested_ones() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json(
                "/api/v1/cities",
                Some(&token),
                json!({
                    "name": "Nowhere",
                    "latitude": 95.0,
                    "longitude": -200.0,
                    "province": { "name": "" }
                }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(resp).await;
        let details: Vec<&str> = body["details"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|d| d.as_str())
            .collect();
        assert!(details.iter().any(|d| d.starts_with("latitude:")));
        assert!(details.iter().any(|d| d.starts_with("longitude:")));
        assert!(details.iter().any(|d| d.starts_with("province.name:")));
        assert!(details.iter().any(|d| d.starts_with("province.country:")));
    }

    #[tokio::test]
    async fn json_patch_moves_a_city() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/cities", Some(&token), city_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/cities/{id}"),
                Some(&token),
                "application/json-patch+json",
                json!([
                    { "op": "replace", "path": "/latitude", "value": 33.31 },
                    { "op": "replace", "path": "/longitude", "value": 44.36 }
                ]),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_json(resp).await;
        assert_eq!(body["latitude"], 33.31);
        assert_eq!(body["longitude"], 44.36);
    }
}
