//! Flat, template-ready representations of posts, tags and comments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::db::models::{CommentWithAuthor, Post, TagWithCount};
use crate::error::{BlogError, BlogResult};
use crate::queries::PostCard;

/// Characters of post text shown in list views.
pub const TEASER_LENGTH: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedTag {
    pub title: String,
    pub posts_with_tag: i64,
}

/// Post as shown in lists and sidebars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPost {
    pub title: String,
    pub teaser_text: String,
    pub author: String,
    pub comments_amount: i64,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub tags: Vec<SerializedTag>,
    pub first_tag_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedComment {
    pub text: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
}

/// Post as shown on its own page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedPostDetail {
    pub title: String,
    pub text: String,
    pub author: String,
    pub comments: Vec<SerializedComment>,
    pub likes_amount: i64,
    pub image_url: Option<String>,
    pub published_at: DateTime<Utc>,
    pub slug: String,
    pub tags: Vec<SerializedTag>,
}

/// First `TEASER_LENGTH` characters, never splitting a code point.
pub fn teaser(text: &str) -> String {
    text.chars().take(TEASER_LENGTH).collect()
}

fn image_url(post: &Post, config: &SiteConfig) -> Option<String> {
    post.image
        .as_deref()
        .filter(|image| !image.is_empty())
        .map(|image| config.media_url_for(image))
}

pub fn serialize_tag(tag: &TagWithCount) -> SerializedTag {
    SerializedTag {
        title: tag.title.clone(),
        posts_with_tag: tag.posts_count,
    }
}

pub fn serialize_tags(tags: &[TagWithCount]) -> Vec<SerializedTag> {
    tags.iter().map(serialize_tag).collect()
}

/// Fails with `MissingTags` for a post without tags; posts are required to
/// carry at least one on write.
pub fn serialize_post(card: &PostCard, config: &SiteConfig) -> BlogResult<SerializedPost> {
    let post = &card.post;
    let first_tag_title = card
        .tags
        .first()
        .map(|tag| tag.title.clone())
        .ok_or_else(|| BlogError::MissingTags(post.slug.clone()))?;

    Ok(SerializedPost {
        title: post.title.clone(),
        teaser_text: teaser(&post.text),
        author: post.author_username.clone(),
        comments_amount: card.comments_count,
        image_url: image_url(post, config),
        published_at: post.published_at,
        slug: post.slug.clone(),
        tags: serialize_tags(&card.tags),
        first_tag_title,
    })
}

pub fn serialize_posts(cards: &[PostCard], config: &SiteConfig) -> BlogResult<Vec<SerializedPost>> {
    cards.iter().map(|card| serialize_post(card, config)).collect()
}

pub fn serialize_comment(comment: &CommentWithAuthor) -> SerializedComment {
    SerializedComment {
        text: comment.text.clone(),
        published_at: comment.published_at,
        author: comment.author_username.clone(),
    }
}

pub fn serialize_post_detail(
    post: &Post,
    comments: &[CommentWithAuthor],
    likes: i64,
    tags: &[TagWithCount],
    config: &SiteConfig,
) -> SerializedPostDetail {
    SerializedPostDetail {
        title: post.title.clone(),
        text: post.text.clone(),
        author: post.author_username.clone(),
        comments: comments.iter().map(serialize_comment).collect(),
        likes_amount: likes,
        image_url: image_url(post, config),
        published_at: post.published_at,
        slug: post.slug.clone(),
        tags: serialize_tags(tags),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config() -> SiteConfig {
        SiteConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            media_url: "/media/".to_string(),
            media_root: "media".to_string(),
            allowed_origins: Vec::new(),
        }
    }

    fn card(image: Option<&str>, tags: Vec<TagWithCount>) -> PostCard {
        PostCard {
            post: Post {
                id: 1,
                title: "Hello".to_string(),
                text: "x".repeat(500),
                slug: "hello".to_string(),
                image: image.map(str::to_string),
                published_at: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
                author_id: 1,
                author_username: "admin".to_string(),
            },
            comments_count: 4,
            tags,
        }
    }

    fn tag(title: &str, posts_count: i64) -> TagWithCount {
        TagWithCount {
            id: 1,
            title: title.to_string(),
            posts_count,
        }
    }

    #[test]
    fn test_teaser_counts_characters() {
        let text = "ж".repeat(300);
        assert_eq!(teaser(&text).chars().count(), TEASER_LENGTH);
        assert_eq!(teaser("short"), "short");
    }

    #[test]
    fn test_serialize_post_without_image() {
        let serialized = serialize_post(&card(None, vec![tag("rust", 3)]), &config()).unwrap();
        assert_eq!(serialized.image_url, None);
        let json = serde_json::to_value(&serialized).unwrap();
        assert!(json["image_url"].is_null());
    }

    #[test]
    fn test_serialize_post_with_image() {
        let serialized =
            serialize_post(&card(Some("covers/hello.png"), vec![tag("rust", 3)]), &config())
                .unwrap();
        assert_eq!(
            serialized.image_url.as_deref(),
            Some("/media/covers/hello.png")
        );
    }

    #[test]
    fn test_serialize_post_fields() {
        let serialized = serialize_post(
            &card(None, vec![tag("async", 1), tag("rust", 3)]),
            &config(),
        )
        .unwrap();
        assert_eq!(serialized.teaser_text.len(), TEASER_LENGTH);
        assert_eq!(serialized.author, "admin");
        assert_eq!(serialized.comments_amount, 4);
        assert_eq!(serialized.first_tag_title, "async");
        assert_eq!(
            serialized.tags,
            vec![
                SerializedTag {
                    title: "async".to_string(),
                    posts_with_tag: 1
                },
                SerializedTag {
                    title: "rust".to_string(),
                    posts_with_tag: 3
                },
            ]
        );
    }

    #[test]
    fn test_serialize_post_without_tags_fails() {
        let err = serialize_post(&card(None, Vec::new()), &config()).unwrap_err();
        assert!(matches!(err, BlogError::MissingTags(slug) if slug == "hello"));
    }
}
