//! Group endpoints: list, get, create, replace, patch, delete, and the
//! `/events` sub-resource.
//!
//! A group owns the events it carried out: replacing or deleting the group
//! cascades through them (and, transitively, through each event's owned
//! target and victim).

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use terrograph_api::dto::{EventDto, GroupDto};
use terrograph_api::model::{EventModel, GroupModel};
use terrograph_api::page::{DepthParams, Page, PageParams, MAX_DEPTH};

use crate::{auth::CurrentUser, error::AppError};

use super::{
    event_country_refs, group_country_refs, validate_against_countries, AppState,
};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<GroupModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (groups, total) = state.storage.list_groups(params.offset(), size).await?;
    let models = groups
        .iter()
        .map(|g| state.assembler.group(g, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/groups", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<GroupModel>, AppError> {
    let group = state
        .storage
        .get_group(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group {id} not found")))?;
    Ok(Json(state.assembler.group(&group, params.effective_depth())))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(dto): Json<GroupDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, group_country_refs(&dto)).await?;
    let node = dto.try_into_node()?;
    let saved = state.storage.save_group(&node).await?;
    let model = state.assembler.group(&saved, MAX_DEPTH);
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
    Json(dto): Json<GroupDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, group_country_refs(&dto)).await?;
    let mut node = dto.try_into_node()?;
    let existed = state.storage.get_group(&id).await?.is_some();
    node.id = id;
    let saved = state.storage.save_group(&node).await?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.group(&saved, MAX_DEPTH))))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    doc: super::patching::PatchDocument,
) -> Result<Json<GroupModel>, AppError> {
    let node = state
        .storage
        .get_group(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group {id} not found")))?;

    let patched = doc.apply(&node)?;
    if patched.id != node.id {
        return Err(AppError::BadRequest("id is immutable and cannot be patched".into()));
    }

    let dto = GroupDto::from_node(&patched);
    validate_against_countries(&state, &dto, group_country_refs(&dto)).await?;

    let saved = state.storage.save_group(&patched).await?;
    Ok(Json(state.assembler.group(&saved, MAX_DEPTH)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_group(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("group {id} not found")))
    }
}

// ---------------------------------------------------------------------------
// /groups/{id}/events
// ---------------------------------------------------------------------------

pub async fn list_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<EventModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (events, total) = match state
        .storage
        .list_group_events(&id, params.offset(), size)
        .await
    {
        Ok(page) => page,
        Err(crate::storage::StorageError::NotFound) => {
            return Err(AppError::NotFound(format!("group {id} not found")))
        }
        Err(e) => return Err(e.into()),
    };
    let models = events
        .iter()
        .map(|e| state.assembler.event(e, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged(&format!("/groups/{id}/events"), page)))
}

/// `POST` records a new event carried out by the group.
pub async fn add_event(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    Json(dto): Json<EventDto>,
) -> Result<impl IntoResponse, AppError> {
    state
        .storage
        .get_group(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("group {id} not found")))?;

    validate_against_countries(&state, &dto, event_country_refs("", &dto)).await?;
    let node = dto.try_into_node()?;
    let saved = state.storage.add_group_event(&id, &node).await?;
    let model = state.assembler.event(&saved, MAX_DEPTH);
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

/// `DELETE` removes every event the group carried out.
pub async fn delete_events(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    match state.storage.delete_group_events(&id).await {
        Ok(_) => Ok(StatusCode::NO_CONTENT),
        Err(crate::storage::StorageError::NotFound) => {
            Err(AppError::NotFound(format!("group {id} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{
        authed_app, delete, event_body, get, patch_json, post_json, read_json,
    };

    fn group_body() -> serde_json::Value {
        json!({ "name": "Black Banner", "events": [event_body()] })
    }

    #[tokio::test]
    async fn create_group_with_events() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json("/api/v1/groups", Some(&token), group_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body = read_json(resp).await;
        assert_eq!(body["name"], "Black Banner");
        assert_eq!(body["events"].as_array().unwrap().len(), 1);
        assert_eq!(body["links"][1]["rel"], "events");
    }

    #[tokio::test]
    async fn empty_event_list_is_a_validation_failure() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json(
                "/api/v1/groups",
                Some(&token),
                json!({ "name": "Black Banner", "events": [] }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn nested_event_violations_carry_indexed_paths() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json(
                "/api/v1/groups",
                Some(&token),
                json!({ "name": "Black Banner", "events": [event_body(), { "summary": "" }] }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(resp).await;
        assert!(body["details"]
            .as_array()
            .unwrap()
            .iter()
            .all(|d| d.as_str().unwrap().starts_with("events[1].")));
    }

    #[tokio::test]
    async fn group_events_subresource_roundtrip() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/groups", Some(&token), group_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .clone()
            .oneshot(post_json(
                &format!("/api/v1/groups/{id}/events"),
                Some(&token),
                event_body(),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let body = read_json(
            app.clone()
                .oneshot(get(&format!("/api/v1/groups/{id}/events"), &token))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["page"]["total_elements"], 2);

        let resp = app
            .clone()
            .oneshot(delete(&format!("/api/v1/groups/{id}/events"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let body = read_json(
            app.clone()
                .oneshot(get(&format!("/api/v1/groups/{id}/events"), &token))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["page"]["total_elements"], 0);

        let resp = app
            .oneshot(get("/api/v1/groups/no-such-group/events", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn deleting_a_group_cascades_to_its_events() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/groups", Some(&token), group_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();
        let event_id = created["events"][0]["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(delete(&format!("/api/v1/groups/{id}"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(get(&format!("/api/v1/events/{event_id}"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn merge_patch_renames_a_group() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/groups", Some(&token), group_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/groups/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "name": "White Banner" }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_json(resp).await;
        assert_eq!(body["name"], "White Banner");
        assert_eq!(body["events"].as_array().unwrap().len(), 1);
    }
}
