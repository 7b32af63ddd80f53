// Comment handlers - nested under a post; only approved comments are addressable

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
        privacy::COMMENT_POLICY,
        validation::{check_required_text, FieldErrors, WriteMode},
    },
    infrastructure::middleware::Vc,
    models::{CommentListParams, CommentRecord, CommentView, CommentWrite},
    services::PostViewerService,
};

pub async fn list_comments(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<i64>,
    ApiQuery(params): ApiQuery<CommentListParams>,
) -> AppResult<Json<Vec<CommentView>>> {
    ensure_post_visible(&state.db, &vc, post_id).await?;

    let comments = state.db.list_approved_comments(post_id, params.ordering.as_deref()).await?;
    let views = PostViewerService::new(state.db.clone())
        .thread_views(post_id, &comments)
        .await?;
    Ok(Json(views))
}

pub async fn get_comment(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath((post_id, comment_id)): ApiPath<(i64, i64)>,
) -> AppResult<Json<CommentView>> {
    ensure_post_visible(&state.db, &vc, post_id).await?;
    let comment = load_approved_comment(&state.db, post_id, comment_id).await?;
    Ok(Json(comment_view(&state, comment).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<CommentWrite>,
) -> AppResult<(StatusCode, Json<CommentView>)> {
    COMMENT_POLICY.check_request(&vc, &Method::POST)?;
    let author_id = vc.require_user()?;
    ensure_post_visible(&state.db, &vc, post_id).await?;

    let mut errors = FieldErrors::new();
    check_required_text(&mut errors, "content", payload.content.as_deref(), None, WriteMode::Create);
    let parent_id = payload.parent.flatten();
    if let Some(parent_id) = parent_id {
        if !state.db.comment_belongs_to_post(parent_id, post_id).await? {
            errors.add("parent", "Parent comment must belong to the same post.");
        }
    }
    errors.into_result()?;

    let content = payload.content.unwrap_or_default();
    let comment = state.db.create_comment(post_id, author_id, parent_id, &content).await?;
    info!(request_id = %vc.request_id, post_id, comment_id = comment.id, "comment created");

    Ok((StatusCode::CREATED, Json(comment_view(&state, comment).await?)))
}

pub async fn replace_comment(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<(i64, i64)>,
    payload: ApiJson<CommentWrite>,
) -> AppResult<Json<CommentView>> {
    update_comment(state, vc, path, payload, Method::PUT, WriteMode::Replace).await
}

pub async fn patch_comment(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<(i64, i64)>,
    payload: ApiJson<CommentWrite>,
) -> AppResult<Json<CommentView>> {
    update_comment(state, vc, path, payload, Method::PATCH, WriteMode::Partial).await
}

async fn update_comment(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath((post_id, comment_id)): ApiPath<(i64, i64)>,
    ApiJson(payload): ApiJson<CommentWrite>,
    method: Method,
    mode: WriteMode,
) -> AppResult<Json<CommentView>> {
    COMMENT_POLICY.check_request(&vc, &method)?;
    ensure_post_visible(&state.db, &vc, post_id).await?;
    let existing = load_approved_comment(&state.db, post_id, comment_id).await?;
    COMMENT_POLICY.check_object(&vc, &method, existing.author_id)?;

    let mut errors = FieldErrors::new();
    check_required_text(&mut errors, "content", payload.content.as_deref(), None, mode);
    if let Some(Some(parent_id)) = payload.parent {
        if !state.db.comment_belongs_to_post(parent_id, post_id).await? {
            errors.add("parent", "Parent comment must belong to the same post.");
        }
    }
    errors.into_result()?;

    // Cycle and depth checks run inside the store's write transaction.
    state
        .db
        .update_comment(comment_id, payload.content.as_deref(), payload.parent)
        .await?;
    info!(request_id = %vc.request_id, post_id, comment_id, "comment updated");

    let comment = load_approved_comment(&state.db, post_id, comment_id).await?;
    Ok(Json(comment_view(&state, comment).await?))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath((post_id, comment_id)): ApiPath<(i64, i64)>,
) -> AppResult<StatusCode> {
    COMMENT_POLICY.check_request(&vc, &Method::DELETE)?;
    ensure_post_visible(&state.db, &vc, post_id).await?;
    let existing = load_approved_comment(&state.db, post_id, comment_id).await?;
    COMMENT_POLICY.check_object(&vc, &Method::DELETE, existing.author_id)?;

    state.db.delete_comment(comment_id).await?;
    info!(request_id = %vc.request_id, post_id, comment_id, "comment deleted");
    Ok(StatusCode::NO_CONTENT)
}

// A post the caller cannot see has no addressable comments.
async fn ensure_post_visible(db: &BlogDatabase, vc: &Vc, post_id: i64) -> AppResult<()> {
    match db.get_post(post_id, !vc.is_authenticated()).await? {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("Post {} not found", post_id))),
    }
}

async fn load_approved_comment(db: &BlogDatabase, post_id: i64, comment_id: i64) -> AppResult<CommentRecord> {
    db.get_approved_comment(post_id, comment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment {} not found", comment_id)))
}

async fn comment_view(state: &AppState, comment: CommentRecord) -> AppResult<CommentView> {
    let id = comment.id;
    PostViewerService::new(state.db.clone())
        .thread_views(comment.post_id, std::slice::from_ref(&comment))
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("comment {} lost while assembling", id)))
}
