//! Province endpoints: list, get, create, replace, patch, delete.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use terrograph_api::dto::ProvinceDto;
use terrograph_api::model::ProvinceModel;
use terrograph_api::page::{DepthParams, Page, PageParams, MAX_DEPTH};

use crate::{auth::CurrentUser, error::AppError};

use super::{province_country_refs, validate_against_countries, AppState};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<ProvinceModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (provinces, total) = state.storage.list_provinces(params.offset(), size).await?;
    let models = provinces
        .iter()
        .map(|p| state.assembler.province(p, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/provinces", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<ProvinceModel>, AppError> {
    let province = state
        .storage
        .get_province(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("province {id} not found")))?;
    Ok(Json(
        state.assembler.province(&province, params.effective_depth()),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(dto): Json<ProvinceDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, province_country_refs("", &dto)).await?;
    let node = dto.try_into_node()?;
    let saved = state.storage.save_province(&node).await?;
    let model = state.assembler.province(&saved, MAX_DEPTH);
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

/// `PUT` replaces the stored province (200), or creates it under the path
/// id when the id is unknown (201).
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    Json(dto): Json<ProvinceDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, province_country_refs("", &dto)).await?;
    let mut node = dto.try_into_node()?;
    let existed = state.storage.get_province(&id).await?.is_some();
    node.id = id;
    let saved = state.storage.save_province(&node).await?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.province(&saved, MAX_DEPTH))))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    doc: super::patching::PatchDocument,
) -> Result<Json<ProvinceModel>, AppError> {
    let node = state
        .storage
        .get_province(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("province {id} not found")))?;

    let patched = doc.apply(&node)?;
    if patched.id != node.id {
        return Err(AppError::BadRequest("id is immutable and cannot be patched".into()));
    }

    let dto = ProvinceDto::from_node(&patched);
    validate_against_countries(&state, &dto, province_country_refs("", &dto)).await?;

    let saved = state.storage.save_province(&patched).await?;
    Ok(Json(state.assembler.province(&saved, MAX_DEPTH)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_province(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("province {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{
        authed_app, delete, get, patch_json, post_json, put_json, read_json,
    };

    fn province_body() -> serde_json::Value {
        json!({ "name": "Nineveh", "country": { "name": "Iraq" } })
    }

    #[tokio::test]
    async fn create_returns_201_with_location_and_resolved_country() {
        let (app, token) = authed_app().await;
        let resp = app
            .clone()
            .oneshot(post_json("/api/v1/provinces", Some(&token), province_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let location = resp
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        let body = read_json(resp).await;
        assert!(location.ends_with(&format!("/api/v1/provinces/{}", body["id"].as_str().unwrap())));
        assert_eq!(body["country"]["name"], "Iraq");
        assert_eq!(
            body["country"]["region"]["name"],
            "Middle East & North Africa"
        );
    }

    #[tokio::test]
    async fn unknown_country_is_a_validation_failure() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json(
                "/api/v1/provinces",
                Some(&token),
                json!({ "name": "Atlantis North", "country": { "name": "Atlantis" } }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(resp).await;
        let details = body["details"].as_array().unwrap();
        assert!(details
            .iter()
            .any(|d| d.as_str().unwrap().starts_with("country.name:")));
    }

    #[tokio::test]
    async fn put_creates_under_path_id_then_replaces() {
        let (app, token) = authed_app().await;
        let resp = app
            .clone()
            .oneshot(put_json(
                "/api/v1/provinces/custom-id",
                Some(&token),
                province_body(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .clone()
            .oneshot(put_json(
                "/api/v1/provinces/custom-id",
                Some(&token),
                json!({ "name": "Renamed", "country": { "name": "Iraq" } }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app
            .oneshot(get("/api/v1/provinces/custom-id", &token))
            .await
            .unwrap();
        let body = read_json(resp).await;
        assert_eq!(body["name"], "Renamed");
    }

    #[tokio::test]
    async fn merge_patch_renames_and_revalidates() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/provinces", Some(&token), province_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(patch_json(
                &format!("/api/v1/provinces/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "name": "Renamed" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_json(resp).await["name"], "Renamed");

        // Blanking the name must fail aggregated validation.
        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/provinces/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "name": "  " }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn delete_then_404() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/provinces", Some(&token), province_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(delete(&format!("/api/v1/provinces/{id}"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(delete(&format!("/api/v1/provinces/{id}"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
