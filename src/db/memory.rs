//! In-process repository
//!
//! Backs the server when no `DATABASE_URL` is configured and drives the test
//! suites. Enforces the same write-side rules as the Postgres backend.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::models::{
    Comment, CommentWithAuthor, NewComment, NewPost, NewTag, NewUser, Post, PostTagRow, Tag, User,
};
use super::repository::{BlogRepository, GroupedCounts};
use super::validation::ValidationError;
use crate::error::{BlogError, BlogResult};
use crate::queries::{order_by_popularity, order_by_recency, order_by_tag_popularity};

/// Stored post row; the author's username is joined on read.
#[derive(Debug, Clone)]
struct PostRow {
    id: i64,
    title: String,
    text: String,
    slug: String,
    image: Option<String>,
    published_at: chrono::DateTime<chrono::Utc>,
    author_id: i64,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i64,
    users: HashMap<i64, User>,
    posts: Vec<PostRow>,
    tags: Vec<Tag>,
    /// (post_id, tag_id)
    post_tags: BTreeSet<(i64, i64)>,
    /// (post_id, user_id)
    likes: BTreeSet<(i64, i64)>,
    comments: Vec<Comment>,
}

impl Tables {
    fn allocate_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn username(&self, user_id: i64) -> String {
        self.users
            .get(&user_id)
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    fn post(&self, row: &PostRow) -> Post {
        Post {
            id: row.id,
            title: row.title.clone(),
            text: row.text.clone(),
            slug: row.slug.clone(),
            image: row.image.clone(),
            published_at: row.published_at,
            author_id: row.author_id,
            author_username: self.username(row.author_id),
        }
    }

    fn all_posts(&self) -> Vec<Post> {
        self.posts.iter().map(|row| self.post(row)).collect()
    }

    fn posts_count(&self, tag_id: i64) -> i64 {
        self.post_tags.iter().filter(|(_, t)| *t == tag_id).count() as i64
    }

    fn likes_grouped_by_post(&self, post_ids: &[i64]) -> GroupedCounts {
        let mut rows: HashMap<i64, i64> = HashMap::new();
        for (post_id, _) in &self.likes {
            *rows.entry(*post_id).or_default() += 1;
        }
        GroupedCounts::total(post_ids, rows)
    }

    fn tag(&self, tag_id: i64) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.id == tag_id)
    }

    fn has_post(&self, post_id: i64) -> bool {
        self.posts.iter().any(|row| row.id == post_id)
    }
}

/// Repository kept entirely in memory behind an async lock.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlogRepository for MemoryRepository {
    async fn ping(&self) -> BlogResult<()> {
        Ok(())
    }

    async fn find_post_by_slug(&self, slug: &str) -> BlogResult<Post> {
        let tables = self.tables.read().await;
        tables
            .posts
            .iter()
            .find(|row| row.slug == slug)
            .map(|row| tables.post(row))
            .ok_or_else(|| BlogError::not_found("post", slug))
    }

    async fn find_tag_by_title(&self, title: &str) -> BlogResult<Tag> {
        let tables = self.tables.read().await;
        tables
            .tags
            .iter()
            .find(|tag| tag.title == title)
            .cloned()
            .ok_or_else(|| BlogError::not_found("tag", title))
    }

    async fn top_posts_by_recency(&self, limit: i64) -> BlogResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let mut posts = order_by_recency(tables.all_posts());
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn top_posts_by_popularity(
        &self,
        limit: i64,
        tag_id: Option<i64>,
    ) -> BlogResult<Vec<Post>> {
        let tables = self.tables.read().await;
        let posts: Vec<Post> = tables
            .all_posts()
            .into_iter()
            .filter(|post| match tag_id {
                Some(tag_id) => tables.post_tags.contains(&(post.id, tag_id)),
                None => true,
            })
            .collect();

        let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
        let likes = tables.likes_grouped_by_post(&ids);

        let mut posts = order_by_popularity(posts, &likes);
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn top_tags_by_popularity(&self, limit: i64) -> BlogResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let ids: Vec<i64> = tables.tags.iter().map(|tag| tag.id).collect();
        let counts = GroupedCounts::total(
            &ids,
            ids.iter().map(|id| (*id, tables.posts_count(*id))),
        );

        let mut tags = order_by_tag_popularity(tables.tags.clone(), &counts);
        tags.truncate(limit.max(0) as usize);
        Ok(tags)
    }

    async fn count_comments_grouped_by_post(
        &self,
        post_ids: &[i64],
    ) -> BlogResult<GroupedCounts> {
        let tables = self.tables.read().await;
        let mut rows: HashMap<i64, i64> = HashMap::new();
        for comment in &tables.comments {
            *rows.entry(comment.post_id).or_default() += 1;
        }
        Ok(GroupedCounts::total(post_ids, rows))
    }

    async fn count_posts_grouped_by_tag(&self, tag_ids: &[i64]) -> BlogResult<GroupedCounts> {
        let tables = self.tables.read().await;
        let mut rows: HashMap<i64, i64> = HashMap::new();
        for (_, tag_id) in &tables.post_tags {
            *rows.entry(*tag_id).or_default() += 1;
        }
        Ok(GroupedCounts::total(tag_ids, rows))
    }

    async fn count_likes_grouped_by_post(&self, post_ids: &[i64]) -> BlogResult<GroupedCounts> {
        let tables = self.tables.read().await;
        Ok(tables.likes_grouped_by_post(post_ids))
    }

    async fn tags_with_counts_for_posts(&self, post_ids: &[i64]) -> BlogResult<Vec<PostTagRow>> {
        let tables = self.tables.read().await;
        let mut rows: Vec<PostTagRow> = tables
            .post_tags
            .iter()
            .filter(|(post_id, _)| post_ids.contains(post_id))
            .filter_map(|(post_id, tag_id)| {
                tables.tag(*tag_id).map(|tag| PostTagRow {
                    post_id: *post_id,
                    id: tag.id,
                    title: tag.title.clone(),
                    posts_count: tables.posts_count(tag.id),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(rows)
    }

    async fn tags_of_post(&self, post_id: i64) -> BlogResult<Vec<Tag>> {
        let tables = self.tables.read().await;
        let mut tags: Vec<Tag> = tables
            .post_tags
            .iter()
            .filter(|(p, _)| *p == post_id)
            .filter_map(|(_, tag_id)| tables.tag(*tag_id).cloned())
            .collect();
        tags.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tags)
    }

    async fn comments_of_post(&self, post_id: i64) -> BlogResult<Vec<CommentWithAuthor>> {
        let tables = self.tables.read().await;
        let mut comments: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by(|a, b| {
            a.published_at
                .cmp(&b.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(comments
            .into_iter()
            .map(|c| CommentWithAuthor {
                id: c.id,
                text: c.text.clone(),
                published_at: c.published_at,
                author_username: tables.username(c.author_id),
            })
            .collect())
    }

    async fn count_likes(&self, post_id: i64) -> BlogResult<i64> {
        let tables = self.tables.read().await;
        Ok(tables.likes_grouped_by_post(&[post_id]).get(post_id))
    }

    async fn create_user(&self, user: NewUser) -> BlogResult<User> {
        let user = user.validate()?;
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(BlogError::conflict("user", user.username));
        }
        let id = tables.allocate_id();
        let user = User {
            id,
            username: user.username,
            is_staff: user.is_staff,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn create_tag(&self, tag: NewTag) -> BlogResult<Tag> {
        let tag = tag.validate()?;
        let mut tables = self.tables.write().await;
        if tables.tags.iter().any(|t| t.title == tag.title) {
            return Err(BlogError::conflict("tag", tag.title));
        }
        let tag = Tag {
            id: tables.allocate_id(),
            title: tag.title,
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn create_post(&self, post: NewPost) -> BlogResult<Post> {
        let post = post.validate()?;
        let mut tables = self.tables.write().await;

        match tables.users.get(&post.author_id) {
            Some(author) if author.is_staff => {}
            Some(_) => return Err(ValidationError::AuthorNotStaff(post.author_id).into()),
            None => {
                return Err(ValidationError::UnknownReference {
                    resource: "user",
                    id: post.author_id,
                }
                .into())
            }
        }
        if let Some(missing) = post.tag_ids.iter().find(|id| tables.tag(**id).is_none()) {
            return Err(ValidationError::UnknownReference {
                resource: "tag",
                id: *missing,
            }
            .into());
        }
        if tables.posts.iter().any(|row| row.slug == post.slug) {
            return Err(BlogError::conflict("post", post.slug));
        }

        let id = tables.allocate_id();
        for tag_id in &post.tag_ids {
            tables.post_tags.insert((id, *tag_id));
        }
        let row = PostRow {
            id,
            title: post.title,
            text: post.text,
            slug: post.slug,
            image: post.image,
            published_at: post.published_at,
            author_id: post.author_id,
        };
        let created = tables.post(&row);
        tables.posts.push(row);
        Ok(created)
    }

    async fn create_comment(&self, comment: NewComment) -> BlogResult<CommentWithAuthor> {
        let comment = comment.validate()?;
        let mut tables = self.tables.write().await;
        if !tables.has_post(comment.post_id) {
            return Err(ValidationError::UnknownReference {
                resource: "post",
                id: comment.post_id,
            }
            .into());
        }
        if !tables.users.contains_key(&comment.author_id) {
            return Err(ValidationError::UnknownReference {
                resource: "user",
                id: comment.author_id,
            }
            .into());
        }

        let stored = Comment {
            id: tables.allocate_id(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            text: comment.text,
            published_at: comment.published_at,
        };
        let created = CommentWithAuthor {
            id: stored.id,
            text: stored.text.clone(),
            published_at: stored.published_at,
            author_username: tables.username(stored.author_id),
        };
        tables.comments.push(stored);
        Ok(created)
    }

    async fn like_post(&self, post_id: i64, user_id: i64) -> BlogResult<()> {
        let mut tables = self.tables.write().await;
        if !tables.has_post(post_id) {
            return Err(ValidationError::UnknownReference {
                resource: "post",
                id: post_id,
            }
            .into());
        }
        if !tables.users.contains_key(&user_id) {
            return Err(ValidationError::UnknownReference {
                resource: "user",
                id: user_id,
            }
            .into());
        }
        tables.likes.insert((post_id, user_id));
        Ok(())
    }

    async fn delete_post(&self, slug: &str) -> BlogResult<()> {
        let mut tables = self.tables.write().await;
        let id = tables
            .posts
            .iter()
            .find(|row| row.slug == slug)
            .map(|row| row.id)
            .ok_or_else(|| BlogError::not_found("post", slug))?;

        tables.posts.retain(|row| row.id != id);
        tables.comments.retain(|c| c.post_id != id);
        tables.post_tags.retain(|(post_id, _)| *post_id != id);
        tables.likes.retain(|(post_id, _)| *post_id != id);
        Ok(())
    }
}
