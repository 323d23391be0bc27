//! Victim endpoints: list, get, create, replace, patch, delete.
//!
//! Victims carry no relations, so there is no depth handling and no
//! referential validation here; only the count constraints apply.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use terrograph::validation::Validate;
use terrograph_api::dto::VictimDto;
use terrograph_api::model::VictimModel;
use terrograph_api::page::{Page, PageParams};

use crate::{auth::CurrentUser, error::AppError};

use super::AppState;

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<VictimModel>>, AppError> {
    let size = params.effective_size();
    let (victims, total) = state.storage.list_victims(params.offset(), size).await?;
    let models = victims.iter().map(|v| state.assembler.victim(v)).collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/victims", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<Json<VictimModel>, AppError> {
    let victim = state
        .storage
        .get_victim(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("victim {id} not found")))?;
    Ok(Json(state.assembler.victim(&victim)))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(dto): Json<VictimDto>,
) -> Result<impl IntoResponse, AppError> {
    let node = dto.try_into_node()?;
    let saved = state.storage.save_victim(&node).await?;
    let model = state.assembler.victim(&saved);
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
    Json(dto): Json<VictimDto>,
) -> Result<impl IntoResponse, AppError> {
    let mut node = dto.try_into_node()?;
    let existed = state.storage.get_victim(&id).await?.is_some();
    node.id = id;
    let saved = state.storage.save_victim(&node).await?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.victim(&saved))))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    doc: super::patching::PatchDocument,
) -> Result<Json<VictimModel>, AppError> {
    let node = state
        .storage
        .get_victim(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("victim {id} not found")))?;

    let patched = doc.apply(&node)?;
    if patched.id != node.id {
        return Err(AppError::BadRequest("id is immutable and cannot be patched".into()));
    }

    VictimDto::from_node(&patched).validate()?;

    let saved = state.storage.save_victim(&patched).await?;
    Ok(Json(state.assembler.victim(&saved)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_victim(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("victim {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{authed_app, patch_json, post_json, read_json};

    fn victim_body() -> serde_json::Value {
        json!({
            "total_fatalities": 3,
            "perpetrator_fatalities": 1,
            "total_injured": 12,
            "perpetrator_injured": 0,
            "property_damage": 250000
        })
    }

    #[tokio::test]
    async fn patch_cannot_break_count_consistency() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/victims", Some(&token), victim_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        // Raising perpetrator fatalities above the total is a 422.
        let resp = app
            .clone()
            .oneshot(patch_json(
                &format!("/api/v1/victims/{id}"),
                Some(&token),
                "application/json-patch+json",
                json!([{ "op": "replace", "path": "/perpetrator_fatalities", "value": 9 }]),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        // A consistent update passes.
        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/victims/{id}"),
                Some(&token),
                "application/json-patch+json",
                json!([{ "op": "replace", "path": "/total_fatalities", "value": 9 }]),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_json(resp).await["total_fatalities"], 9);
    }

    #[tokio::test]
    async fn patching_the_id_is_rejected() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/victims", Some(&token), victim_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/victims/{id}"),
                Some(&token),
                "application/json-patch+json",
                json!([{ "op": "replace", "path": "/id", "value": "hijacked" }]),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
