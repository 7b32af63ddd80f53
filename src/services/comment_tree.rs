// Reply trees - one flat load, indexed by parent, materialized from a root set

use std::collections::HashMap;

use crate::{
    entities::MAX_REPLY_DEPTH,
    error::{AppError, AppResult},
    models::{CommentRecord, CommentView, UserSummary},
};

/// Children of every comment, keyed by parent id, in load order.
pub struct ReplyIndex<'a> {
    children: HashMap<i64, Vec<&'a CommentRecord>>,
}

impl<'a> ReplyIndex<'a> {
    /// `comments` is everything loaded for one post, already sorted by
    /// `created_at`; that order carries over to every `replies` list.
    pub fn new(comments: &'a [CommentRecord]) -> Self {
        let mut children: HashMap<i64, Vec<&'a CommentRecord>> = HashMap::new();
        for comment in comments {
            if let Some(parent_id) = comment.parent_id {
                children.entry(parent_id).or_default().push(comment);
            }
        }
        Self { children }
    }

    pub fn replies_of(&self, id: i64) -> &[&'a CommentRecord] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Builds the view of `comment` with all of its descendants. A chain
    /// deeper than the store allows (or a cyclic one) is an internal error.
    pub fn materialize(
        &self,
        comment: &CommentRecord,
        authors: &HashMap<i64, UserSummary>,
    ) -> AppResult<CommentView> {
        self.materialize_at(comment, authors, 0)
    }

    fn materialize_at(
        &self,
        comment: &CommentRecord,
        authors: &HashMap<i64, UserSummary>,
        depth: i64,
    ) -> AppResult<CommentView> {
        if depth > MAX_REPLY_DEPTH {
            return Err(AppError::Internal(format!(
                "reply chain below comment {} exceeds {} levels",
                comment.id, MAX_REPLY_DEPTH
            )));
        }

        let author = authors.get(&comment.author_id).cloned().ok_or_else(|| {
            AppError::Internal(format!(
                "author {} of comment {} not loaded",
                comment.author_id, comment.id
            ))
        })?;

        let replies = self
            .replies_of(comment.id)
            .iter()
            .map(|reply| self.materialize_at(reply, authors, depth + 1))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(CommentView {
            id: comment.id,
            content: comment.content.clone(),
            author,
            parent: comment.parent_id,
            replies,
            is_approved: comment.is_approved,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        })
    }

    pub fn materialize_all<'r, I>(
        &self,
        roots: I,
        authors: &HashMap<i64, UserSummary>,
    ) -> AppResult<Vec<CommentView>>
    where
        I: IntoIterator<Item = &'r CommentRecord>,
    {
        roots
            .into_iter()
            .map(|root| self.materialize(root, authors))
            .collect()
    }
}

/// Distinct author ids across `comments`.
pub fn author_ids(comments: &[CommentRecord]) -> Vec<i64> {
    let mut ids: Vec<i64> = comments.iter().map(|c| c.author_id).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn user(id: i64) -> UserSummary {
        UserSummary {
            id,
            username: format!("user{}", id),
            email: format!("user{}@example.com", id),
            first_name: String::new(),
            last_name: String::new(),
            date_joined: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn comment(id: i64, parent_id: Option<i64>, is_approved: bool) -> CommentRecord {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::minutes(id);
        CommentRecord {
            id,
            post_id: 1,
            author_id: 1 + id % 2,
            parent_id,
            content: format!("comment {}", id),
            is_approved,
            created_at: at,
            updated_at: at,
        }
    }

    fn authors() -> HashMap<i64, UserSummary> {
        [user(1), user(2)].into_iter().map(|u| (u.id, u)).collect()
    }

    #[test]
    fn test_nested_replies_are_materialized_in_order() {
        let comments = vec![
            comment(1, None, true),
            comment(2, Some(1), true),
            comment(3, Some(2), true),
            comment(4, Some(1), true),
            comment(5, None, true),
        ];
        let index = ReplyIndex::new(&comments);
        let roots = comments.iter().filter(|c| c.parent_id.is_none());
        let tree = index.materialize_all(roots, &authors()).unwrap();

        assert_eq!(tree.len(), 2);
        let first = &tree[0];
        assert_eq!(first.replies.iter().map(|r| r.id).collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(first.replies[0].replies[0].id, 3);
        assert_eq!(first.replies[0].replies[0].parent, Some(2));
        assert!(first.replies[1].replies.is_empty());
        assert!(tree[1].replies.is_empty());
    }

    #[test]
    fn test_unapproved_replies_are_still_children() {
        let comments = vec![comment(1, None, true), comment(2, Some(1), false)];
        let index = ReplyIndex::new(&comments);
        let view = index.materialize(&comments[0], &authors()).unwrap();
        assert_eq!(view.replies.len(), 1);
        assert!(!view.replies[0].is_approved);
    }

    #[test]
    fn test_missing_author_is_an_internal_error() {
        let comments = vec![comment(1, None, true)];
        let index = ReplyIndex::new(&comments);
        let result = index.materialize(&comments[0], &HashMap::new());
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_cyclic_records_fail_instead_of_recursing() {
        let comments = vec![comment(1, Some(2), true), comment(2, Some(1), true)];
        let index = ReplyIndex::new(&comments);
        let result = index.materialize(&comments[0], &authors());
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[test]
    fn test_depth_limit_bounds_materialization() {
        let chain: Vec<CommentRecord> = (1..=MAX_REPLY_DEPTH + 1)
            .map(|id| comment(id, if id == 1 { None } else { Some(id - 1) }, true))
            .collect();
        let index = ReplyIndex::new(&chain);
        assert!(index.materialize(&chain[0], &authors()).is_ok());

        let mut deeper = chain.clone();
        deeper.push(comment(MAX_REPLY_DEPTH + 2, Some(MAX_REPLY_DEPTH + 1), true));
        let index = ReplyIndex::new(&deeper);
        assert!(matches!(
            index.materialize(&deeper[0], &authors()),
            Err(AppError::Internal(_))
        ));
    }

    #[test]
    fn test_author_ids_are_distinct() {
        let comments = vec![comment(1, None, true), comment(2, None, true), comment(3, None, true)];
        assert_eq!(author_ids(&comments), vec![1, 2]);
    }
}
