use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{app_state::AppState, error::AppResult, models::BlogStats};

pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "blog_api",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// Static map of the documented endpoints.
pub async fn api_overview() -> Json<Value> {
    Json(json!({
        "API Overview": "/api/",
        "Posts": "/api/posts/",
        "Post Detail": "/api/posts/{id}/",
        "Categories": "/api/categories/",
        "Tags": "/api/tags/",
        "Comments": "/api/posts/{post_id}/comments/",
        "User Profile": "/api/profile/me/",
        "Featured Posts": "/api/posts/featured/",
        "Posts by Category": "/api/posts/by_category/?category_id={id}",
        "Posts by Tag": "/api/posts/by_tag/?tag_id={id}"
    }))
}

pub async fn blog_stats(State(state): State<AppState>) -> AppResult<Json<BlogStats>> {
    Ok(Json(state.db.blog_stats().await?))
}
