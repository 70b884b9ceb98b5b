//! Database Models - structs representing database tables (used by sqlx/serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// User model. Only the fields the blog reads are mapped.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

/// New user for insertion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub is_staff: bool,
}

/// Post model, with the author's username joined in.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    pub slug: String,
    /// Path relative to the media root, if the post has an image.
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_id: i64,
    pub author_username: String,
}

/// New post for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub slug: String,
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_id: i64,
    pub tag_ids: Vec<i64>,
}

/// Tag model
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub title: String,
}

/// New tag for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTag {
    pub title: String,
}

/// Comment model
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub published_at: DateTime<Utc>,
}

/// Comment with its author's username, as shown under a post.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct CommentWithAuthor {
    pub id: i64,
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub author_username: String,
}

/// New comment for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: i64,
    pub author_id: i64,
    pub text: String,
    pub published_at: DateTime<Utc>,
}

/// Tag plus the number of posts referencing it.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TagWithCount {
    pub id: i64,
    pub title: String,
    pub posts_count: i64,
}

/// One row of a batched post -> tags fetch.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct PostTagRow {
    pub post_id: i64,
    pub id: i64,
    pub title: String,
    pub posts_count: i64,
}

impl PostTagRow {
    pub fn into_tag(self) -> TagWithCount {
        TagWithCount {
            id: self.id,
            title: self.title,
            posts_count: self.posts_count,
        }
    }
}
