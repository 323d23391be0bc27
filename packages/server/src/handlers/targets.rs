//! Target endpoints: list, get, create, replace, patch, delete.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use terrograph_api::dto::TargetDto;
use terrograph_api::model::TargetModel;
use terrograph_api::page::{DepthParams, Page, PageParams, MAX_DEPTH};

use crate::{auth::CurrentUser, error::AppError};

use super::{target_country_refs, validate_against_countries, AppState};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<TargetModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (targets, total) = state.storage.list_targets(params.offset(), size).await?;
    let models = targets
        .iter()
        .map(|t| state.assembler.target(t, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/targets", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<TargetModel>, AppError> {
    let target = state
        .storage
        .get_target(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("target {id} not found")))?;
    Ok(Json(state.assembler.target(&target, params.effective_depth())))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(dto): Json<TargetDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, target_country_refs("", &dto)).await?;
    let node = dto.try_into_node()?;
    let saved = state.storage.save_target(&node).await?;
    let model = state.assembler.target(&saved, MAX_DEPTH);
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
    Json(dto): Json<TargetDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, target_country_refs("", &dto)).await?;
    let mut node = dto.try_into_node()?;
    let existed = state.storage.get_target(&id).await?.is_some();
    node.id = id;
    let saved = state.storage.save_target(&node).await?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.target(&saved, MAX_DEPTH))))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    doc: super::patching::PatchDocument,
) -> Result<Json<TargetModel>, AppError> {
    let node = state
        .storage
        .get_target(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("target {id} not found")))?;

    let patched = doc.apply(&node)?;
    if patched.id != node.id {
        return Err(AppError::BadRequest("id is immutable and cannot be patched".into()));
    }

    let dto = TargetDto::from_node(&patched);
    validate_against_countries(&state, &dto, target_country_refs("", &dto)).await?;

    let saved = state.storage.save_target(&patched).await?;
    Ok(Json(state.assembler.target(&saved, MAX_DEPTH)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_target(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("target {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{authed_app, patch_json, post_json, read_json};

    #[tokio::test]
    async fn create_and_patch_target_country() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json(
                    "/api/v1/targets",
                    Some(&token),
                    json!({ "name": "Police convoy", "country_of_origin": { "name": "Iraq" } }),
                ))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        // Re-pointing the origin at another seeded country works...
        let resp = app
            .clone()
            .oneshot(patch_json(
                &format!("/api/v1/targets/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "country_of_origin": { "name": "Syria" } }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_json(resp).await["country_of_origin"]["name"], "Syria");

        // ...but an unseeded one fails referential validation.
        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/targets/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "country_of_origin": { "name": "Atlantis" } }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
