//! Repository interface shared by the Postgres and in-memory backends.

use std::collections::HashMap;

use async_trait::async_trait;

use super::models::{
    CommentWithAuthor, NewComment, NewPost, NewTag, NewUser, Post, PostTagRow, Tag, User,
};
use crate::error::BlogResult;

/// Counts keyed by row id, covering every requested id.
///
/// Grouped SQL aggregates omit keys with no matching rows; construction
/// through [`GroupedCounts::total`] fills those keys with zero, so
/// [`GroupedCounts::get`] is defined for every id that was asked about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupedCounts {
    counts: HashMap<i64, i64>,
}

impl GroupedCounts {
    pub fn total<I>(requested: &[i64], rows: I) -> Self
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut counts: HashMap<i64, i64> = requested.iter().map(|id| (*id, 0)).collect();
        for (id, count) in rows {
            if let Some(slot) = counts.get_mut(&id) {
                *slot = count;
            }
        }
        Self { counts }
    }

    /// Zero for ids with no related rows.
    pub fn get(&self, id: i64) -> i64 {
        self.counts.get(&id).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Typed storage operations for the blog.
///
/// Reads never issue per-row queries: every `*_grouped_*` and `*_for_posts`
/// method takes a whole id set and answers it in one round trip. Writes
/// validate and normalize their input before storing it.
#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn ping(&self) -> BlogResult<()>;

    async fn find_post_by_slug(&self, slug: &str) -> BlogResult<Post>;

    async fn find_tag_by_title(&self, title: &str) -> BlogResult<Tag>;

    /// Most recent first.
    async fn top_posts_by_recency(&self, limit: i64) -> BlogResult<Vec<Post>>;

    /// Most liked first, optionally only posts carrying `tag_id`.
    async fn top_posts_by_popularity(
        &self,
        limit: i64,
        tag_id: Option<i64>,
    ) -> BlogResult<Vec<Post>>;

    /// Most referenced first.
    async fn top_tags_by_popularity(&self, limit: i64) -> BlogResult<Vec<Tag>>;

    async fn count_comments_grouped_by_post(&self, post_ids: &[i64])
        -> BlogResult<GroupedCounts>;

    async fn count_posts_grouped_by_tag(&self, tag_ids: &[i64]) -> BlogResult<GroupedCounts>;

    async fn count_likes_grouped_by_post(&self, post_ids: &[i64]) -> BlogResult<GroupedCounts>;

    /// Every tag of every given post, each with its post count, tag titles
    /// ascending.
    async fn tags_with_counts_for_posts(&self, post_ids: &[i64]) -> BlogResult<Vec<PostTagRow>>;

    /// Tags of one post, titles ascending.
    async fn tags_of_post(&self, post_id: i64) -> BlogResult<Vec<Tag>>;

    /// Comments of one post, oldest first.
    async fn comments_of_post(&self, post_id: i64) -> BlogResult<Vec<CommentWithAuthor>>;

    async fn count_likes(&self, post_id: i64) -> BlogResult<i64>;

    async fn create_user(&self, user: NewUser) -> BlogResult<User>;

    async fn create_tag(&self, tag: NewTag) -> BlogResult<Tag>;

    async fn create_post(&self, post: NewPost) -> BlogResult<Post>;

    async fn create_comment(&self, comment: NewComment) -> BlogResult<CommentWithAuthor>;

    /// Idempotent: liking twice counts once.
    async fn like_post(&self, post_id: i64, user_id: i64) -> BlogResult<()>;

    /// Removes the post with its comments, likes and tag links.
    async fn delete_post(&self, slug: &str) -> BlogResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_fills_missing_keys_with_zero() {
        let counts = GroupedCounts::total(&[1, 2, 3], vec![(1, 4), (3, 1)]);
        assert_eq!(counts.len(), 3);
        assert_eq!(counts.get(1), 4);
        assert_eq!(counts.get(2), 0);
        assert_eq!(counts.get(3), 1);
    }

    #[test]
    fn test_total_ignores_unrequested_rows() {
        let counts = GroupedCounts::total(&[1], vec![(1, 2), (9, 7)]);
        assert_eq!(counts.len(), 1);
        assert_eq!(counts.get(1), 2);
        assert_eq!(counts.get(9), 0);
    }

    #[test]
    fn test_empty_request() {
        let counts = GroupedCounts::total(&[], Vec::new());
        assert!(counts.is_empty());
    }
}
