//! Event endpoints: list, get, create, replace, patch, delete, and the
//! `/targets` sub-resource.
//!
//! Events own their target and victim nodes; replacing or deleting an event
//! replaces or deletes them too. Cities are shared and deduplicated by
//! (name, latitude, longitude) on write.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use terrograph_api::dto::{EventDto, TargetDto};
use terrograph_api::model::{EventModel, TargetModel};
use terrograph_api::page::{DepthParams, Page, PageParams, MAX_DEPTH};

use crate::{auth::CurrentUser, error::AppError, storage::StorageError};

use super::{event_country_refs, target_country_refs, validate_against_countries, AppState};

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
    _user: CurrentUser,
) -> Result<Json<Page<EventModel>>, AppError> {
    let size = params.effective_size();
    let depth = params.effective_depth();
    let (events, total) = state.storage.list_events(params.offset(), size).await?;
    let models = events
        .iter()
        .map(|e| state.assembler.event(e, depth))
        .collect();
    let page = Page::new(models, params.page, size, total);
    Ok(Json(state.assembler.paged("/events", page)))
}

pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<EventModel>, AppError> {
    let event = state
        .storage
        .get_event(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))?;
    Ok(Json(state.assembler.event(&event, params.effective_depth())))
}

pub async fn create(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(dto): Json<EventDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, event_country_refs("", &dto)).await?;
    let node = dto.try_into_node()?;
    let saved = state.storage.save_event(&node).await?;
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

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    Json(dto): Json<EventDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, event_country_refs("", &dto)).await?;
    let mut node = dto.try_into_node()?;
    let existed = state.storage.get_event(&id).await?.is_some();
    node.id = id;
    let saved = state.storage.save_event(&node).await?;
    let status = if existed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.event(&saved, MAX_DEPTH))))
}

pub async fn patch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    doc: super::patching::PatchDocument,
) -> Result<Json<EventModel>, AppError> {
    let node = state
        .storage
        .get_event(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))?;

    let patched = doc.apply(&node)?;
    if patched.id != node.id {
        return Err(AppError::BadRequest("id is immutable and cannot be patched".into()));
    }

    let dto = EventDto::from_node(&patched);
    validate_against_countries(&state, &dto, event_country_refs("", &dto)).await?;

    let saved = state.storage.save_event(&patched).await?;
    Ok(Json(state.assembler.event(&saved, MAX_DEPTH)))
}

pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    if state.storage.delete_event(&id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("event {id} not found")))
    }
}

// ---------------------------------------------------------------------------
// /events/{id}/targets
// ---------------------------------------------------------------------------

pub async fn get_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DepthParams>,
    _user: CurrentUser,
) -> Result<Json<TargetModel>, AppError> {
    let event = state
        .storage
        .get_event(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))?;
    let target = event
        .target
        .ok_or_else(|| AppError::NotFound(format!("event {id} has no target")))?;
    Ok(Json(state.assembler.target(&target, params.effective_depth())))
}

/// `PUT` sets the event's target: 201 when the event had none, 200 when an
/// existing target was replaced.
pub async fn put_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
    Json(dto): Json<TargetDto>,
) -> Result<impl IntoResponse, AppError> {
    validate_against_countries(&state, &dto, target_country_refs("", &dto)).await?;
    let node = dto.try_into_node()?;

    let event = state
        .storage
        .get_event(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("event {id} not found")))?;
    let had_target = event.target.is_some();

    let saved = match state.storage.set_event_target(&id, &node).await {
        Ok(saved) => saved,
        Err(StorageError::NotFound) => {
            return Err(AppError::NotFound(format!("event {id} not found")))
        }
        Err(e) => return Err(e.into()),
    };
    let status = if had_target {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(state.assembler.target(&saved, MAX_DEPTH))))
}

pub async fn delete_target(
    State(state): State<AppState>,
    Path(id): Path<String>,
    _user: CurrentUser,
) -> Result<StatusCode, AppError> {
    match state.storage.delete_event_target(&id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Err(AppError::NotFound(format!("event {id} has no target"))),
        Err(StorageError::NotFound) => {
            Err(AppError::NotFound(format!("event {id} not found")))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::test_support::{
        authed_app, delete, event_body, get, patch_json, post_json, put_json, read_json,
    };

    #[tokio::test]
    async fn create_event_renders_everything_and_sets_location() {
        let (app, token) = authed_app().await;
        let resp = app
            .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        assert!(resp.headers().contains_key("location"));
        let body = read_json(resp).await;
        assert_eq!(body["target"]["country_of_origin"]["name"], "Iraq");
        assert_eq!(body["victim"]["total_injured"], 12);
        assert_eq!(
            body["city"]["province"]["country"]["region"]["name"],
            "Middle East & North Africa"
        );
        assert_eq!(body["links"][1]["rel"], "target");
    }

    #[tokio::test]
    async fn depth_limits_nested_rendering_on_get() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let body = read_json(
            app.oneshot(get(&format!("/api/v1/events/{id}?depth=1"), &token))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["target"]["name"], "Market");
        assert!(body["target"].get("country_of_origin").is_none());
        assert!(body["city"].get("province").is_none());
    }

    #[tokio::test]
    async fn merge_patch_updates_scalars_and_keeps_relations() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/events/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "motive": "Retaliation", "suicidal": true }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = read_json(resp).await;
        assert_eq!(body["motive"], "Retaliation");
        assert_eq!(body["suicidal"], true);
        assert_eq!(body["target"]["name"], "Market");
    }

    #[tokio::test]
    async fn merge_patch_removing_the_target_fails_revalidation() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let resp = app
            .oneshot(patch_json(
                &format!("/api/v1/events/{id}"),
                Some(&token),
                "application/merge-patch+json",
                json!({ "target": null }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = read_json(resp).await;
        assert!(body["details"]
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d.as_str().unwrap().starts_with("target:")));
    }

    #[tokio::test]
    async fn patch_with_plain_json_content_type_is_415() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let req = Request::builder()
            .method("PATCH")
            .uri(format!("/api/v1/events/{id}"))
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn target_subresource_roundtrip() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();

        let body = read_json(
            app.clone()
                .oneshot(get(&format!("/api/v1/events/{id}/targets"), &token))
                .await
                .unwrap(),
        )
        .await;
        assert_eq!(body["name"], "Market");

        // Replacing an existing target answers 200.
        let resp = app
            .clone()
            .oneshot(put_json(
                &format!("/api/v1/events/{id}/targets"),
                Some(&token),
                json!({ "name": "Checkpoint", "country_of_origin": { "name": "Syria" } }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(read_json(resp).await["name"], "Checkpoint");

        let resp = app
            .clone()
            .oneshot(delete(&format!("/api/v1/events/{id}/targets"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        // Setting a target where none exists answers 201.
        let resp = app
            .clone()
            .oneshot(put_json(
                &format!("/api/v1/events/{id}/targets"),
                Some(&token),
                json!({ "name": "Convoy", "country_of_origin": { "name": "Iraq" } }),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(get("/api/v1/events/no-such-event/targets", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_event_removes_its_satellites() {
        let (app, token) = authed_app().await;
        let created = read_json(
            app.clone()
                .oneshot(post_json("/api/v1/events", Some(&token), event_body()))
                .await
                .unwrap(),
        )
        .await;
        let id = created["id"].as_str().unwrap();
        let victim_id = created["victim"]["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(delete(&format!("/api/v1/events/{id}"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = app
            .oneshot(get(&format!("/api/v1/victims/{victim_id}"), &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
