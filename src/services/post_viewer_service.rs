// PostViewerService - turns stored rows into the nested views the API returns
// Related rows (authors, categories, tags) are loaded in batches per page.

use std::sync::Arc;

use crate::{
    database::BlogDatabase,
    error::{AppError, AppResult},
    models::{CommentRecord, CommentView, PostDetailView, PostListView, PostRecord, ProfileRecord, ProfileView},
    services::comment_tree::{author_ids, ReplyIndex},
};

#[derive(Clone)]
pub struct PostViewerService {
    db: Arc<BlogDatabase>,
}

impl PostViewerService {
    pub fn new(db: Arc<BlogDatabase>) -> Self {
        Self { db }
    }

    /// Summaries for a page of posts, in the order given.
    pub async fn list_views(&self, posts: Vec<PostRecord>) -> AppResult<Vec<PostListView>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let mut user_ids: Vec<i64> = posts.iter().map(|p| p.author_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let mut category_ids: Vec<i64> = posts.iter().filter_map(|p| p.category_id).collect();
        category_ids.sort_unstable();
        category_ids.dedup();
        let post_ids: Vec<i64> = posts.iter().map(|p| p.id).collect();

        let authors = self.db.users_by_ids(&user_ids).await?;
        let categories = self.db.categories_by_ids(&category_ids).await?;
        let mut tags = self.db.tags_for_posts(&post_ids).await?;

        posts
            .into_iter()
            .map(|post| {
                let author = authors.get(&post.author_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("author {} of post {} not loaded", post.author_id, post.id))
                })?;
                let category = post.category_id.and_then(|id| categories.get(&id).cloned());
                let post_tags = tags.remove(&post.id).unwrap_or_default();

                Ok(PostListView {
                    id: post.id,
                    title: post.title,
                    slug: post.slug,
                    excerpt: post.excerpt,
                    author,
                    category,
                    tags: post_tags,
                    status: post.status,
                    featured_image: post.featured_image,
                    is_featured: post.is_featured,
                    view_count: post.view_count,
                    comments_count: post.comments_count,
                    created_at: post.created_at,
                    updated_at: post.updated_at,
                    published_at: post.published_at,
                })
            })
            .collect()
    }

    /// Full post: summary fields, body and every comment with its replies.
    pub async fn detail_view(&self, post: PostRecord) -> AppResult<PostDetailView> {
        let content = post.content.clone();
        let post_id = post.id;
        let summary = self
            .list_views(vec![post])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("post {} lost while assembling", post_id)))?;

        let comments = self.db.comments_for_post(post_id).await?;
        let comments = self.comment_views(&comments, comments.iter()).await?;

        Ok(PostDetailView {
            summary,
            content,
            comments,
        })
    }

    /// Views of `roots`, with replies drawn from `all` (the post's full comment set).
    pub async fn comment_views<'r, I>(&self, all: &[CommentRecord], roots: I) -> AppResult<Vec<CommentView>>
    where
        I: IntoIterator<Item = &'r CommentRecord>,
    {
        let authors = self.db.users_by_ids(&author_ids(all)).await?;
        ReplyIndex::new(all).materialize_all(roots, &authors)
    }

    /// Views of some of the post's comments, each with its full reply tree.
    pub async fn thread_views(&self, post_id: i64, roots: &[CommentRecord]) -> AppResult<Vec<CommentView>> {
        let all = self.db.comments_for_post(post_id).await?;
        self.comment_views(&all, roots.iter()).await
    }

    pub async fn profile_views(&self, profiles: Vec<ProfileRecord>) -> AppResult<Vec<ProfileView>> {
        let mut user_ids: Vec<i64> = profiles.iter().map(|p| p.user_id).collect();
        user_ids.sort_unstable();
        user_ids.dedup();
        let users = self.db.users_by_ids(&user_ids).await?;

        profiles
            .into_iter()
            .map(|profile| {
                let user = users.get(&profile.user_id).cloned().ok_or_else(|| {
                    AppError::Internal(format!("user {} of profile {} not loaded", profile.user_id, profile.id))
                })?;
                Ok(ProfileView {
                    id: profile.id,
                    user,
                    bio: profile.bio,
                    avatar: profile.avatar,
                    website: profile.website,
                    location: profile.location,
                    birth_date: profile.birth_date,
                    is_verified: profile.is_verified,
                    created_at: profile.created_at,
                    updated_at: profile.updated_at,
                })
            })
            .collect()
    }

    pub async fn profile_view(&self, profile: ProfileRecord) -> AppResult<ProfileView> {
        let id = profile.id;
        self.profile_views(vec![profile])
            .await?
            .pop()
            .ok_or_else(|| AppError::Internal(format!("profile {} lost while assembling", id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::NewPost;
    use crate::models::{NewUser, PostStatus};

    async fn setup() -> (Arc<BlogDatabase>, i64) {
        let db = Arc::new(BlogDatabase::in_memory().await.unwrap());
        let user = db
            .create_user(NewUser {
                username: "ada".to_string(),
                email: "ada@example.com".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                is_staff: false,
                api_token: "token-ada".to_string(),
            })
            .await
            .unwrap();
        (db, user.id)
    }

    #[tokio::test]
    async fn test_list_views_attach_author_category_and_tags() {
        let (db, author_id) = setup().await;
        let category = db.create_category("Rust", "").await.unwrap();
        let tag = db.create_tag("async", "#112233").await.unwrap();

        let mut post = NewPost::new("Hello", "Body");
        post.category_id = Some(category.id);
        post.tag_ids = vec![tag.id];
        post.status = PostStatus::Published;
        let id = db.create_post(author_id, &post).await.unwrap();

        let service = PostViewerService::new(db.clone());
        let record = db.get_post(id, false).await.unwrap().unwrap();
        let views = service.list_views(vec![record]).await.unwrap();

        assert_eq!(views[0].author.username, "ada");
        assert_eq!(views[0].category.as_ref().map(|c| c.posts_count), Some(1));
        assert_eq!(views[0].tags.iter().map(|t| t.id).collect::<Vec<_>>(), vec![tag.id]);
    }

    #[tokio::test]
    async fn test_detail_view_nests_replies() {
        let (db, author_id) = setup().await;
        let id = db.create_post(author_id, &NewPost::new("Thread", "Body")).await.unwrap();
        let root = db.create_comment(id, author_id, None, "root").await.unwrap();
        db.create_comment(id, author_id, Some(root.id), "reply").await.unwrap();

        let service = PostViewerService::new(db.clone());
        let record = db.get_post(id, false).await.unwrap().unwrap();
        let detail = service.detail_view(record).await.unwrap();

        assert_eq!(detail.content, "Body");
        // Every comment appears at the top level, replies nested under their parent.
        assert_eq!(detail.comments.len(), 2);
        assert_eq!(detail.comments[0].replies[0].content, "reply");
    }
}
