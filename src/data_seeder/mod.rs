// Demo data - a staff account, an author and a handful of posts to explore the API with

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
    database::BlogDatabase,
    entities::NewPost,
    error::AppResult,
    models::{NewUser, PostStatus, UserSummary},
};

const ADMIN_USERNAME: &str = "admin";

/// Seeds sample content once. Running it against an already seeded
/// database is a no-op.
pub async fn seed_demo_data(db: &BlogDatabase) -> AppResult<()> {
    if db.find_user_by_username(ADMIN_USERNAME).await?.is_some() {
        info!("Demo data already present, skipping seed");
        return Ok(());
    }

    info!("Seeding demo data...");

    let admin = create_demo_user(db, ADMIN_USERNAME, "Site", "Admin", true).await?;
    let author = create_demo_user(db, "writer", "Jane", "Writer", false).await?;

    let tech = db
        .create_category("Technology", "Programming, tooling and infrastructure")
        .await?;
    let life = db.create_category("Lifestyle", "Everything else").await?;

    let rust = db.create_tag("rust", "#dea584").await?;
    let web = db.create_tag("web", "#007bff").await?;
    let notes = db.create_tag("notes", "#6c757d").await?;

    let mut welcome = NewPost::new(
        "Welcome to the blog",
        "This is the first post. Comments are open, so say hello.",
    );
    welcome.excerpt = "The first post.".to_string();
    welcome.category_id = Some(life.id);
    welcome.tag_ids = vec![notes.id];
    welcome.status = PostStatus::Published;
    welcome.is_featured = true;
    welcome.published_at = Some(Utc::now());
    let welcome_id = db.create_post(admin.id, &welcome).await?;

    let mut axum_post = NewPost::new(
        "Building a REST API with axum",
        "Routers, extractors and middleware, with SQLite underneath.",
    );
    axum_post.excerpt = "A tour of an axum service.".to_string();
    axum_post.category_id = Some(tech.id);
    axum_post.tag_ids = vec![rust.id, web.id];
    axum_post.status = PostStatus::Published;
    axum_post.published_at = Some(Utc::now());
    let axum_id = db.create_post(author.id, &axum_post).await?;

    let mut draft = NewPost::new("Unfinished thoughts", "Still writing this one.");
    draft.category_id = Some(tech.id);
    draft.tag_ids = vec![notes.id];
    db.create_post(author.id, &draft).await?;

    let first = db
        .create_comment(welcome_id, author.id, None, "Congratulations on the launch!")
        .await?;
    db.create_comment(welcome_id, admin.id, Some(first.id), "Thanks!")
        .await?;
    db.create_comment(axum_id, admin.id, None, "Great walkthrough.")
        .await?;

    db.get_or_create_profile(author.id).await?;

    info!("Demo data seeded: 2 users, 2 categories, 3 tags, 3 posts, 3 comments");
    Ok(())
}

async fn create_demo_user(
    db: &BlogDatabase,
    username: &str,
    first_name: &str,
    last_name: &str,
    is_staff: bool,
) -> AppResult<UserSummary> {
    let api_token = Uuid::new_v4().simple().to_string();
    let user = db
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{}@example.com", username),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            is_staff,
            api_token: api_token.clone(),
        })
        .await?;

    info!(user_id = user.id, "Created {} (token: {})", username, api_token);
    Ok(user)
}
