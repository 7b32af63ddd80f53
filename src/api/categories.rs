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
        privacy::CATEGORY_POLICY,
        validation::{check_required_text, FieldErrors, WriteMode},
    },
    infrastructure::middleware::Vc,
    models::{Category, CategoryWrite, ListParams},
};

pub async fn list_categories(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListParams>,
) -> AppResult<Json<Vec<Category>>> {
    let search = search_terms(params.search.as_deref());
    let categories = state.db.list_categories(&search, params.ordering.as_deref()).await?;
    Ok(Json(categories))
}

pub async fn get_category(
    State(state): State<AppState>,
    ApiPath(category_id): ApiPath<i64>,
) -> AppResult<Json<Category>> {
    Ok(Json(load_category(&state.db, category_id).await?))
}

pub async fn create_category(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(payload): ApiJson<CategoryWrite>,
) -> AppResult<(StatusCode, Json<Category>)> {
    CATEGORY_POLICY.check_request(&vc, &Method::POST)?;
    validate(&payload, WriteMode::Create)?;

    let name = payload.name.unwrap_or_default();
    let description = payload.description.unwrap_or_default();
    let category = state.db.create_category(&name, &description).await?;
    info!(request_id = %vc.request_id, category_id = category.id, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn replace_category(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<i64>,
    payload: ApiJson<CategoryWrite>,
) -> AppResult<Json<Category>> {
    update_category(state, vc, path, payload, Method::PUT, WriteMode::Replace).await
}

pub async fn patch_category(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<i64>,
    payload: ApiJson<CategoryWrite>,
) -> AppResult<Json<Category>> {
    update_category(state, vc, path, payload, Method::PATCH, WriteMode::Partial).await
}

async fn update_category(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(category_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CategoryWrite>,
    method: Method,
    mode: WriteMode,
) -> AppResult<Json<Category>> {
    CATEGORY_POLICY.check_request(&vc, &method)?;
    load_category(&state.db, category_id).await?;
    validate(&payload, mode)?;

    state
        .db
        .update_category(category_id, payload.name.as_deref(), payload.description.as_deref())
        .await?;
    info!(request_id = %vc.request_id, category_id, "category updated");
    Ok(Json(load_category(&state.db, category_id).await?))
}

pub async fn delete_category(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(category_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    CATEGORY_POLICY.check_request(&vc, &Method::DELETE)?;
    load_category(&state.db, category_id).await?;

    state.db.delete_category(category_id).await?;
    info!(request_id = %vc.request_id, category_id, "category deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn validate(payload: &CategoryWrite, mode: WriteMode) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    check_required_text(&mut errors, "name", payload.name.as_deref(), Some(100), mode);
    errors.into_result()
}

async fn load_category(db: &BlogDatabase, category_id: i64) -> AppResult<Category> {
    db.get_category(category_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Category {} not found", category_id)))
}
