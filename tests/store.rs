use std::sync::Arc;

use blog_api::{
    config::DatabaseConfig,
    database::BlogDatabase,
    entities::{NewPost, PostChanges, PostFilter, MAX_REPLY_DEPTH},
    error::AppError,
    models::{NewUser, PostStatus},
};

async fn setup() -> (BlogDatabase, i64) {
    let db = BlogDatabase::in_memory().await.unwrap();
    let user = db
        .create_user(NewUser {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            first_name: "Alice".to_string(),
            last_name: String::new(),
            is_staff: false,
            api_token: "alice-token".to_string(),
        })
        .await
        .unwrap();
    (db, user.id)
}

fn published(title: &str) -> NewPost {
    let mut post = NewPost::new(title, "content");
    post.status = PostStatus::Published;
    post
}

#[tokio::test]
async fn test_derived_slugs_get_numeric_suffixes() {
    let (db, author) = setup().await;

    let mut slugs = Vec::new();
    for _ in 0..3 {
        let id = db.create_post(author, &NewPost::new("Same Title", "x")).await.unwrap();
        slugs.push(db.get_post(id, false).await.unwrap().unwrap().slug);
    }
    assert_eq!(slugs, vec!["same-title", "same-title-2", "same-title-3"]);

    let id = db.create_post(author, &NewPost::new("!!!", "x")).await.unwrap();
    assert_eq!(db.get_post(id, false).await.unwrap().unwrap().slug, "post");
}

#[tokio::test]
async fn test_explicit_slug_collision_is_a_field_error() {
    let (db, author) = setup().await;
    let mut post = NewPost::new("One", "x");
    post.slug = Some("fixed".to_string());
    db.create_post(author, &post).await.unwrap();

    match db.create_post(author, &post).await {
        Err(AppError::Validation(fields)) => assert!(fields.get("slug").is_some()),
        other => panic!("expected slug validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_view_count_only_goes_down_on_reset() {
    let (db, author) = setup().await;
    let draft = db.create_post(author, &NewPost::new("Hidden", "x")).await.unwrap();

    assert!(!db.increment_view_count(draft, true).await.unwrap());
    assert!(db.increment_view_count(draft, false).await.unwrap());
    assert!(db.increment_view_count(draft, false).await.unwrap());

    let post = db.get_post(draft, false).await.unwrap().unwrap();
    assert_eq!(post.view_count, 2);
    assert_eq!(post.updated_at, post.created_at);

    db.reset_view_count(draft).await.unwrap();
    assert_eq!(db.get_post(draft, false).await.unwrap().unwrap().view_count, 0);
}

#[tokio::test]
async fn test_deleting_category_keeps_posts() {
    let (db, author) = setup().await;
    let category = db.create_category("Temp", "").await.unwrap();
    let mut post = published("Filed");
    post.category_id = Some(category.id);
    let id = db.create_post(author, &post).await.unwrap();

    assert!(db.delete_category(category.id).await.unwrap());
    let post = db.get_post(id, false).await.unwrap().unwrap();
    assert_eq!(post.category_id, None);
}

#[tokio::test]
async fn test_deleting_post_removes_comments_and_memberships() {
    let (db, author) = setup().await;
    let tag = db.create_tag("gone", "#000000").await.unwrap();
    let mut post = published("Doomed");
    post.tag_ids = vec![tag.id, tag.id];
    let id = db.create_post(author, &post).await.unwrap();
    let comment = db.create_comment(id, author, None, "bye").await.unwrap();

    assert_eq!(db.get_tag(tag.id).await.unwrap().unwrap().posts_count, 1);
    assert!(db.delete_post(id).await.unwrap());

    assert!(db.get_comment(comment.id).await.unwrap().is_none());
    assert_eq!(db.get_tag(tag.id).await.unwrap().unwrap().posts_count, 0);
}

#[tokio::test]
async fn test_deleting_comment_removes_its_replies() {
    let (db, author) = setup().await;
    let post = db.create_post(author, &published("Thread")).await.unwrap();
    let root = db.create_comment(post, author, None, "root").await.unwrap();
    let reply = db.create_comment(post, author, Some(root.id), "reply").await.unwrap();
    let nested = db.create_comment(post, author, Some(reply.id), "nested").await.unwrap();

    db.delete_comment(reply.id).await.unwrap();
    assert!(db.get_comment(root.id).await.unwrap().is_some());
    assert!(db.get_comment(nested.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_deleting_user_cascades() {
    let (db, author) = setup().await;
    let post = db.create_post(author, &published("Mine")).await.unwrap();
    db.get_or_create_profile(author).await.unwrap();

    assert!(db.delete_user(author).await.unwrap());
    assert!(db.get_post(post, false).await.unwrap().is_none());
    assert_eq!(db.count_profiles_for_user(author).await.unwrap(), 0);
}

fn assert_parent_error<T: std::fmt::Debug>(result: Result<T, AppError>) {
    match result {
        Err(AppError::Validation(fields)) => assert!(fields.get("parent").is_some()),
        other => panic!("expected parent validation error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_reparenting_rejects_cycles() {
    let (db, author) = setup().await;
    let post = db.create_post(author, &published("Tree")).await.unwrap();
    let a = db.create_comment(post, author, None, "a").await.unwrap();
    let b = db.create_comment(post, author, Some(a.id), "b").await.unwrap();
    let c = db.create_comment(post, author, Some(b.id), "c").await.unwrap();
    let other = db.create_comment(post, author, None, "other").await.unwrap();

    assert_parent_error(db.update_comment(a.id, Some("moved"), Some(Some(a.id))).await);
    assert_parent_error(db.update_comment(a.id, None, Some(Some(c.id))).await);
    let a_now = db.get_comment(a.id).await.unwrap().unwrap();
    assert_eq!((a_now.parent_id, a_now.content.as_str()), (None, "a"));

    assert!(db.update_comment(c.id, None, Some(Some(a.id))).await.unwrap());
    assert!(db.update_comment(a.id, None, Some(Some(other.id))).await.unwrap());
    assert_eq!(db.get_comment(a.id).await.unwrap().unwrap().parent_id, Some(other.id));
    assert!(!db.update_comment(9999, None, Some(None)).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_crossed_reparents_leave_a_tree() {
    let dir = tempfile::tempdir().unwrap();
    let db = BlogDatabase::new(&DatabaseConfig {
        url: format!("sqlite:{}", dir.path().join("race.db").display()),
        max_connections: 5,
    })
    .await
    .unwrap();
    db.init().await.unwrap();
    let author = db
        .create_user(NewUser {
            username: "racer".to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            is_staff: false,
            api_token: "racer-token".to_string(),
        })
        .await
        .unwrap()
        .id;
    let db = Arc::new(db);
    let post = db.create_post(author, &published("Race")).await.unwrap();

    for _ in 0..50 {
        let a = db.create_comment(post, author, None, "a").await.unwrap().id;
        let b = db.create_comment(post, author, None, "b").await.unwrap().id;

        let (left, right) = (db.clone(), db.clone());
        let first = tokio::spawn(async move { left.update_comment(a, None, Some(Some(b))).await });
        let second = tokio::spawn(async move { right.update_comment(b, None, Some(Some(a))).await });
        let outcomes = [first.await.unwrap(), second.await.unwrap()];

        assert_eq!(outcomes.iter().filter(|r| matches!(r, Ok(true))).count(), 1);
        assert_eq!(
            outcomes.iter().filter(|r| matches!(r, Err(AppError::Validation(_)))).count(),
            1
        );
        let a_parent = db.get_comment(a).await.unwrap().unwrap().parent_id;
        let b_parent = db.get_comment(b).await.unwrap().unwrap().parent_id;
        assert!(a_parent.is_none() || b_parent.is_none());
    }
}

#[tokio::test]
async fn test_reply_depth_limit_on_create_and_move() {
    let (db, author) = setup().await;
    let post = db.create_post(author, &published("Deep")).await.unwrap();

    let mut parent = db.create_comment(post, author, None, "root").await.unwrap().id;
    for _ in 0..MAX_REPLY_DEPTH {
        parent = db.create_comment(post, author, Some(parent), "reply").await.unwrap().id;
    }
    let before = db.comments_for_post(post).await.unwrap().len();
    assert_parent_error(db.create_comment(post, author, Some(parent), "too deep").await);
    assert_eq!(db.comments_for_post(post).await.unwrap().len(), before);

    let loose = db.create_comment(post, author, None, "loose").await.unwrap();
    assert_parent_error(db.update_comment(loose.id, None, Some(Some(parent))).await);
    assert_eq!(db.get_comment(loose.id).await.unwrap().unwrap().parent_id, None);
}

#[tokio::test]
async fn test_update_post_tags_absent_versus_empty() {
    let (db, author) = setup().await;
    let tag = db.create_tag("keep", "#123456").await.unwrap();
    let mut post = published("Tags");
    post.tag_ids = vec![tag.id];
    let id = db.create_post(author, &post).await.unwrap();

    let rename = PostChanges {
        title: Some("Renamed".to_string()),
        ..PostChanges::default()
    };
    assert!(db.update_post(id, &rename).await.unwrap());
    assert_eq!(db.tags_for_posts(&[id]).await.unwrap()[&id].len(), 1);

    let clear = PostChanges {
        tag_ids: Some(Vec::new()),
        ..PostChanges::default()
    };
    db.update_post(id, &clear).await.unwrap();
    assert!(db.tags_for_posts(&[id]).await.unwrap().get(&id).is_none());

    assert!(!db.update_post(9999, &rename).await.unwrap());
}

#[tokio::test]
async fn test_list_filters_compose() {
    let (db, author) = setup().await;
    let mut featured = published("Featured one");
    featured.is_featured = true;
    let featured_id = db.create_post(author, &featured).await.unwrap();
    db.create_post(author, &published("Ordinary")).await.unwrap();
    db.create_post(author, &NewPost::new("Featured draft", "x")).await.unwrap();

    let filter = PostFilter {
        published_only: true,
        is_featured: Some(true),
        ..PostFilter::default()
    };
    let posts = db.list_posts(&filter, None).await.unwrap();
    assert_eq!(posts.iter().map(|p| p.id).collect::<Vec<_>>(), vec![featured_id]);

    let search = PostFilter {
        search: vec!["featured".to_string()],
        ..PostFilter::visible_to(true)
    };
    assert_eq!(db.list_posts(&search, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_profile_get_or_create_is_idempotent() {
    let (db, author) = setup().await;
    let first = db.get_or_create_profile(author).await.unwrap();
    let second = db.get_or_create_profile(author).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(db.count_profiles_for_user(author).await.unwrap(), 1);
}
