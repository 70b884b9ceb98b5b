//! Write-side validation
//!
//! Every repository implementation runs these checks before touching storage,
//! so normalization and field limits hold no matter which backend is in use.

use regex::Regex;
use thiserror::Error;

use super::models::{NewComment, NewPost, NewTag, NewUser};

pub const POST_TITLE_MAX: usize = 200;
pub const POST_SLUG_MAX: usize = 200;
pub const TAG_TITLE_MAX: usize = 20;
pub const USERNAME_MAX: usize = 150;

lazy_static::lazy_static! {
    /// Valid slug pattern: ASCII letters, numbers, underscores and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[-a-zA-Z0-9_]+$").unwrap();
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field}: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    #[error("user {0} is not staff and cannot author posts")]
    AuthorNotStaff(i64),

    #[error("unknown {resource} id {id}")]
    UnknownReference { resource: &'static str, id: i64 },

    #[error("a post needs at least one tag")]
    NoTags,
}

pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// Tag titles are stored lowercase.
pub fn normalize_tag_title(title: &str) -> String {
    title.to_lowercase()
}

fn check_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

impl NewUser {
    pub fn validate(self) -> Result<Self, ValidationError> {
        check_text("username", &self.username, USERNAME_MAX)?;
        Ok(self)
    }
}

impl NewTag {
    /// Lowercases the title and checks its length.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let title = normalize_tag_title(&self.title);
        check_text("title", &title, TAG_TITLE_MAX)?;
        Ok(Self { title })
    }
}

impl NewPost {
    /// Field-level checks. Author and tag references are checked by the
    /// repository against stored rows.
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        check_text("title", &self.title, POST_TITLE_MAX)?;
        check_text("slug", &self.slug, POST_SLUG_MAX)?;
        if !is_valid_slug(&self.slug) {
            return Err(ValidationError::InvalidFormat {
                field: "slug",
                reason: "must contain only letters, numbers, underscores or hyphens",
            });
        }
        self.tag_ids.sort_unstable();
        self.tag_ids.dedup();
        if self.tag_ids.is_empty() {
            return Err(ValidationError::NoTags);
        }
        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                self.image = None;
            }
        }
        Ok(self)
    }
}

impl NewComment {
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::Empty { field: "text" });
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_post(slug: &str, tag_ids: Vec<i64>) -> NewPost {
        NewPost {
            title: "Hello".to_string(),
            text: "Body".to_string(),
            slug: slug.to_string(),
            image: None,
            published_at: Utc::now(),
            author_id: 1,
            tag_ids,
        }
    }

    #[test]
    fn test_tag_title_is_lowercased() {
        let tag = NewTag {
            title: "Python".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(tag.title, "python");
    }

    #[test]
    fn test_tag_title_too_long() {
        let err = NewTag {
            title: "a".repeat(TAG_TITLE_MAX + 1),
        }
        .validate()
        .unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "title",
                max: TAG_TITLE_MAX
            }
        );
    }

    #[test]
    fn test_blank_tag_rejected() {
        let err = NewTag {
            title: "   ".to_string(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, ValidationError::Empty { field: "title" });
    }

    #[test]
    fn test_tag_title_is_lowercased_not_trimmed() {
        let tag = NewTag {
            title: "Rust ".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(tag.title, "rust ");
    }

    #[test]
    fn test_slug_format() {
        assert!(is_valid_slug("my-post"));
        assert!(is_valid_slug("post-2024"));
        assert!(is_valid_slug("my_post"));
        assert!(is_valid_slug("Post-1"));
        assert!(!is_valid_slug("not a slug"));
        assert!(!is_valid_slug("post/1"));
        assert!(!is_valid_slug("пост"));
    }

    #[test]
    fn test_post_without_tags_rejected() {
        let err = new_post("my-post", vec![]).validate().unwrap_err();
        assert_eq!(err, ValidationError::NoTags);
    }

    #[test]
    fn test_post_tag_ids_are_deduplicated() {
        let post = new_post("my-post", vec![3, 1, 3]).validate().unwrap();
        assert_eq!(post.tag_ids, vec![1, 3]);
    }

    #[test]
    fn test_post_bad_slug_rejected() {
        let err = new_post("Not A Slug", vec![1]).validate().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { field: "slug", .. }));
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 200,
        };
        assert_eq!(
            err.to_string(),
            "title exceeds maximum length of 200 characters"
        );
    }
}
