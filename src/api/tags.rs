use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use tracing::info;

use crate::{
    app_state::AppState,
    database::BlogDatabase,
    error::{AppError, AppResult},
    framework::{
        extract::{ApiJson, ApiPath, ApiQuery},
        listing::search_terms,
        privacy::TAG_POLICY,
        validation::{check_hex_color, check_required_text, FieldErrors, WriteMode},
    },
    infrastructure::middleware::Vc,
    models::{ListParams, Tag, TagWrite, DEFAULT_TAG_COLOR},
};

pub async fn list_tags(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<Json<Vec<Tag>>> {
    let search = search_terms(params.search.as_deref());
    let tags = state.db.list_tags(&search, params.ordering.as_deref()).await?;
    Ok(Json(tags))
}

pub async fn get_tag(State(state): State<AppState>, ApiPath(tag_id): ApiPath<i64>) -> AppResult<Json<Tag>> {
    Ok(Json(load_tag(&state.db, tag_id).await?))
}

pub async fn create_tag(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(payload): ApiJson<TagWrite>,
) -> AppResult<(StatusCode, Json<Tag>)> {
    TAG_POLICY.check_request(&vc, &Method::POST)?;
    validate(&payload, WriteMode::Create)?;

    let name = payload.name.unwrap_or_default();
    let color = payload.color.unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());
    let tag = state.db.create_tag(&name, &color).await?;
    info!(request_id = %vc.request_id, tag_id = tag.id, "tag created");
    Ok((StatusCode::CREATED, Json(tag)))
}

pub async fn replace_tag(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<i64>,
    payload: ApiJson<TagWrite>,
) -> AppResult<Json<Tag>> {
    update_tag(state, vc, path, payload, Method::PUT, WriteMode::Replace).await
}

pub async fn patch_tag(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<i64>,
    payload: ApiJson<TagWrite>,
) -> AppResult<Json<Tag>> {
    update_tag(state, vc, path, payload, Method::PATCH, WriteMode::Partial).await
}

async fn update_tag(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(tag_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<TagWrite>,
    method: Method,
    mode: WriteMode,
) -> AppResult<Json<Tag>> {
    TAG_POLICY.check_request(&vc, &method)?;
    load_tag(&state.db, tag_id).await?;
    validate(&payload, mode)?;

    state
        .db
        .update_tag(tag_id, payload.name.as_deref(), payload.color.as_deref())
        .await?;
    info!(request_id = %vc.request_id, tag_id, "tag updated");
    Ok(Json(load_tag(&state.db, tag_id).await?))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(tag_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    TAG_POLICY.check_request(&vc, &Method::DELETE)?;
    load_tag(&state.db, tag_id).await?;

    state.db.delete_tag(tag_id).await?;
    info!(request_id = %vc.request_id, tag_id, "tag deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(payload: &TagWrite, mode: WriteMode) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    check_required_text(&mut errors, "name", payload.name.as_deref(), Some(50), mode);
    if let Some(color) = &payload.color {
        check_hex_color(&mut errors, "color", color);
    }
    errors.into_result()
}

async fn load_tag(db: &BlogDatabase, tag_id: i64) -> AppResult<Tag> {
    db.get_tag(tag_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Tag {} not found", tag_id)))
}
