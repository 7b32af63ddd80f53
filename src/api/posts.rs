// Post handlers - list/filter/search, CRUD with owner-write, and the
// featured / by_category / by_tag listings

use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use tracing::info;

use crate::{
    app_state::AppState,
    database::BlogDatabase,
    entities::{NewPost, PostChanges, PostFilter},
    error::{AppError, AppResult},
    framework::{
        extract::{ApiJson, ApiPath, ApiQuery},
        listing::search_terms,
        privacy::POST_POLICY,
        validation::{
            check_max_len, check_required_text, check_url, parse_bool_param, parse_id_param, FieldErrors,
            WriteMode,
        },
    },
    infrastructure::middleware::Vc,
    models::{
        ByCategoryParams, ByTagParams, PostDetailView, PostListParams, PostListView, PostRecord, PostStatus,
        PostWrite,
    },
    services::PostViewerService,
};

pub async fn list_posts(
    State(state): State<AppState>,
    vc: Vc,
    ApiQuery(params): ApiQuery<PostListParams>,
) -> AppResult<Json<Vec<PostListView>>> {
    let status = match params.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<PostStatus>().map_err(|msg| AppError::field("status", msg))?),
    };

    let filter = PostFilter {
        status,
        category_id: parse_id_param("category", params.category.as_deref())?,
        tag_id: parse_id_param("tags", params.tags.as_deref())?,
        is_featured: parse_bool_param("is_featured", params.is_featured.as_deref())?,
        search: search_terms(params.search.as_deref()),
        ..PostFilter::visible_to(vc.is_authenticated())
    };

    let posts = state.db.list_posts(&filter, params.ordering.as_deref()).await?;
    let views = PostViewerService::new(state.db.clone()).list_views(posts).await?;
    Ok(Json(views))
}

/// Counts the view, then returns the post with the new count.
pub async fn get_post(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<i64>,
) -> AppResult<Json<PostDetailView>> {
    let published_only = !vc.is_authenticated();
    if !state.db.increment_view_count(post_id, published_only).await? {
        return Err(post_not_found(post_id));
    }

    let post = load_visible_post(&state.db, post_id, published_only).await?;
    let detail = PostViewerService::new(state.db.clone()).detail_view(post).await?;
    Ok(Json(detail))
}

pub async fn create_post(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(payload): ApiJson<PostWrite>,
) -> AppResult<(StatusCode, Json<PostDetailView>)> {
    POST_POLICY.check_request(&vc, &Method::POST)?;
    let author_id = vc.require_user()?;

    let changes = validate_post_write(&state.db, payload, WriteMode::Create).await?;
    let post = NewPost {
        title: changes.title.unwrap_or_default(),
        slug: None,
        content: changes.content.unwrap_or_default(),
        excerpt: changes.excerpt.unwrap_or_default(),
        category_id: changes.category_id.flatten(),
        tag_ids: changes.tag_ids.unwrap_or_default(),
        status: changes.status.unwrap_or_default(),
        featured_image: changes.featured_image.flatten(),
        is_featured: changes.is_featured.unwrap_or(false),
        published_at: changes.published_at.flatten(),
    };

    let post_id = state.db.create_post(author_id, &post).await?;
    info!(request_id = %vc.request_id, post_id, author_id, "post created");

    let record = load_visible_post(&state.db, post_id, false).await?;
    let detail = PostViewerService::new(state.db.clone()).detail_view(record).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn replace_post(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<i64>,
    payload: ApiJson<PostWrite>,
) -> AppResult<Json<PostDetailView>> {
    update_post(state, vc, path, payload, Method::PUT, WriteMode::Replace).await
}

pub async fn patch_post(
    state: State<AppState>,
    vc: Vc,
    path: ApiPath<i64>,
    payload: ApiJson<PostWrite>,
) -> AppResult<Json<PostDetailView>> {
    update_post(state, vc, path, payload, Method::PATCH, WriteMode::Partial).await
}

async fn update_post(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<PostWrite>,
    method: Method,
    mode: WriteMode,
) -> AppResult<Json<PostDetailView>> {
    POST_POLICY.check_request(&vc, &method)?;
    let existing = load_visible_post(&state.db, post_id, !vc.is_authenticated()).await?;
    POST_POLICY.check_object(&vc, &method, existing.author_id)?;

    let changes = validate_post_write(&state.db, payload, mode).await?;
    if !state.db.update_post(post_id, &changes).await? {
        return Err(post_not_found(post_id));
    }
    info!(request_id = %vc.request_id, post_id, "post updated");

    let record = load_visible_post(&state.db, post_id, false).await?;
    let detail = PostViewerService::new(state.db.clone()).detail_view(record).await?;
    Ok(Json(detail))
}

pub async fn delete_post(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(post_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    POST_POLICY.check_request(&vc, &Method::DELETE)?;
    let existing = load_visible_post(&state.db, post_id, !vc.is_authenticated()).await?;
    POST_POLICY.check_object(&vc, &Method::DELETE, existing.author_id)?;

    state.db.delete_post(post_id).await?;
    info!(request_id = %vc.request_id, post_id, "post deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Featured and published, default ordering.
pub async fn featured_posts(State(state): State<AppState>) -> AppResult<Json<Vec<PostListView>>> {
    let filter = PostFilter {
        published_only: true,
        is_featured: Some(true),
        ..PostFilter::default()
    };
    published_listing(&state, &filter).await
}

pub async fn posts_by_category(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ByCategoryParams>,
) -> AppResult<Json<Vec<PostListView>>> {
    let category_id = parse_id_param("category_id", params.category_id.as_deref())?
        .ok_or_else(|| AppError::BadRequest("category_id parameter is required".to_string()))?;

    let filter = PostFilter {
        published_only: true,
        category_id: Some(category_id),
        ..PostFilter::default()
    };
    published_listing(&state, &filter).await
}

pub async fn posts_by_tag(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ByTagParams>,
) -> AppResult<Json<Vec<PostListView>>> {
    let tag_id = parse_id_param("tag_id", params.tag_id.as_deref())?
        .ok_or_else(|| AppError::BadRequest("tag_id parameter is required".to_string()))?;

    let filter = PostFilter {
        published_only: true,
        tag_id: Some(tag_id),
        ..PostFilter::default()
    };
    published_listing(&state, &filter).await
}

async fn published_listing(state: &AppState, filter: &PostFilter) -> AppResult<Json<Vec<PostListView>>> {
    let posts = state.db.list_posts(filter, None).await?;
    let views = PostViewerService::new(state.db.clone()).list_views(posts).await?;
    Ok(Json(views))
}

async fn load_visible_post(db: &BlogDatabase, post_id: i64, published_only: bool) -> AppResult<PostRecord> {
    db.get_post(post_id, published_only)
        .await?
        .ok_or_else(|| post_not_found(post_id))
}

fn post_not_found(post_id: i64) -> AppError {
    AppError::NotFound(format!("Post {} not found", post_id))
}

/// Checks a post payload and resolves it into store changes. Referenced
/// category and tag ids must exist.
async fn validate_post_write(db: &BlogDatabase, payload: PostWrite, mode: WriteMode) -> AppResult<PostChanges> {
    let mut errors = FieldErrors::new();

    check_required_text(&mut errors, "title", payload.title.as_deref(), Some(200), mode);
    check_required_text(&mut errors, "content", payload.content.as_deref(), None, mode);
    if let Some(excerpt) = &payload.excerpt {
        check_max_len(&mut errors, "excerpt", excerpt, 300);
    }

    let status = match payload.status.as_deref() {
        Some(raw) => match raw.parse::<PostStatus>() {
            Ok(status) => Some(status),
            Err(msg) => {
                errors.add("status", msg);
                None
            }
        },
        None => None,
    };

    // Blank clears the image, like an explicit null.
    let featured_image = payload
        .featured_image
        .map(|image| image.filter(|url| !url.trim().is_empty()));
    if let Some(Some(url)) = &featured_image {
        check_url(&mut errors, "featured_image", url);
    }

    if let Some(Some(category_id)) = payload.category {
        if !db.category_exists(category_id).await? {
            errors.add(
                "category",
                format!("Invalid pk \"{}\" - object does not exist.", category_id),
            );
        }
    }

    if let Some(tag_ids) = &payload.tags {
        for missing in db.missing_tag_ids(tag_ids).await? {
            errors.add("tags", format!("Invalid pk \"{}\" - object does not exist.", missing));
        }
    }

    errors.into_result()?;

    Ok(PostChanges {
        title: payload.title,
        content: payload.content,
        excerpt: payload.excerpt,
        category_id: payload.category,
        tag_ids: payload.tags,
        status,
        featured_image,
        is_featured: payload.is_featured,
        published_at: payload.published_at,
    })
}
