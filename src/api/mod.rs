// HTTP surface - one routing table for every resource

pub mod categories;
pub mod comments;
pub mod overview;
pub mod posts;
pub mod profiles;
pub mod tags;

use axum::{
    middleware,
    routing::get,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{app_state::AppState, infrastructure::middleware::viewer_context_middleware};

/// Builds the full router. Every request passes through the viewer-context
/// middleware first, so handlers can rely on the `Vc` extractor.
pub fn create_blog_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(overview::health_check))
        .route("/api/", get(overview::api_overview))
        .route("/api/stats/", get(overview::blog_stats))
        // Posts
        .route("/api/posts/", get(posts::list_posts).post(posts::create_post))
        .route("/api/posts/featured/", get(posts::featured_posts))
        .route("/api/posts/by_category/", get(posts::posts_by_category))
        .route("/api/posts/by_tag/", get(posts::posts_by_tag))
        .route(
            "/api/posts/{post_id}/",
            get(posts::get_post)
                .put(posts::replace_post)
                .patch(posts::patch_post)
                .delete(posts::delete_post),
        )
        // Comments, nested under their post
        .route(
            "/api/posts/{post_id}/comments/",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/posts/{post_id}/comments/{comment_id}/",
            get(comments::get_comment)
                .put(comments::replace_comment)
                .patch(comments::patch_comment)
                .delete(comments::delete_comment),
        )
        // Categories and tags
        .route(
            "/api/categories/",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/api/categories/{category_id}/",
            get(categories::get_category)
                .put(categories::replace_category)
                .patch(categories::patch_category)
                .delete(categories::delete_category),
        )
        .route("/api/tags/", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/api/tags/{tag_id}/",
            get(tags::get_tag)
                .put(tags::replace_tag)
                .patch(tags::patch_tag)
                .delete(tags::delete_tag),
        )
        // Profiles
        .route(
            "/api/profile/me/",
            get(profiles::get_my_profile)
                .put(profiles::update_my_profile)
                .patch(profiles::update_my_profile),
        )
        .route("/api/profile/", get(profiles::list_profiles).post(profiles::create_profile))
        .route(
            "/api/profile/{profile_id}/",
            get(profiles::get_profile)
                .put(profiles::update_profile)
                .patch(profiles::update_profile)
                .delete(profiles::delete_profile),
        )
        .layer(middleware::from_fn_with_state(state.clone(), viewer_context_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
