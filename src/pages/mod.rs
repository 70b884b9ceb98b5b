//! Page assembly: each page selects bounded collections, attaches counts and
//! flattens everything into a template context.

pub mod serialize;

use serde::{Deserialize, Serialize};

use crate::config::SiteConfig;
use crate::db::BlogRepository;
use crate::error::BlogResult;
use crate::queries::{attach_tag_counts, hydrate_posts};
use serialize::{
    serialize_post_detail, serialize_posts, serialize_tags, SerializedPost, SerializedPostDetail,
    SerializedTag,
};

/// Entries in each home page list and in the sidebars.
pub const LIST_SIZE: i64 = 5;
/// Posts listed on a tag page.
pub const TAG_PAGE_SIZE: i64 = 20;

/// Template name plus the context it is rendered with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<C> {
    pub template: String,
    pub context: C,
}

impl<C> Page<C> {
    pub fn new(template: &str, context: C) -> Self {
        Self {
            template: template.to_string(),
            context,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeContext {
    pub most_popular_posts: Vec<SerializedPost>,
    pub page_posts: Vec<SerializedPost>,
    pub popular_tags: Vec<SerializedTag>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostDetailContext {
    pub post: SerializedPostDetail,
    pub popular_tags: Vec<SerializedTag>,
    pub most_popular_posts: Vec<SerializedPost>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagFilterContext {
    pub tag: String,
    pub popular_tags: Vec<SerializedTag>,
    pub posts: Vec<SerializedPost>,
    pub most_popular_posts: Vec<SerializedPost>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContactsContext {}

async fn popular_posts<R>(
    repo: &R,
    config: &SiteConfig,
    limit: i64,
    tag_id: Option<i64>,
) -> BlogResult<Vec<SerializedPost>>
where
    R: BlogRepository + ?Sized,
{
    let posts = repo.top_posts_by_popularity(limit, tag_id).await?;
    let cards = hydrate_posts(repo, posts).await?;
    serialize_posts(&cards, config)
}

async fn popular_tags<R>(repo: &R) -> BlogResult<Vec<SerializedTag>>
where
    R: BlogRepository + ?Sized,
{
    let tags = repo.top_tags_by_popularity(LIST_SIZE).await?;
    let tags = attach_tag_counts(repo, tags).await?;
    Ok(serialize_tags(&tags))
}

#[tracing::instrument(skip_all)]
pub async fn home_page<R>(repo: &R, config: &SiteConfig) -> BlogResult<Page<HomeContext>>
where
    R: BlogRepository + ?Sized,
{
    let most_popular_posts = popular_posts(repo, config, LIST_SIZE, None).await?;

    let fresh = repo.top_posts_by_recency(LIST_SIZE).await?;
    let fresh = hydrate_posts(repo, fresh).await?;
    let page_posts = serialize_posts(&fresh, config)?;

    let popular_tags = popular_tags(repo).await?;

    Ok(Page::new(
        "index.html",
        HomeContext {
            most_popular_posts,
            page_posts,
            popular_tags,
        },
    ))
}

#[tracing::instrument(skip(repo, config))]
pub async fn post_detail_page<R>(
    repo: &R,
    config: &SiteConfig,
    slug: &str,
) -> BlogResult<Page<PostDetailContext>>
where
    R: BlogRepository + ?Sized,
{
    let post = repo.find_post_by_slug(slug).await?;
    let comments = repo.comments_of_post(post.id).await?;
    let likes = repo.count_likes(post.id).await?;
    let tags = repo.tags_of_post(post.id).await?;
    let tags = attach_tag_counts(repo, tags).await?;

    let most_popular_posts = popular_posts(repo, config, LIST_SIZE, None).await?;
    let popular_tags = popular_tags(repo).await?;

    tracing::debug!(
        slug = %post.slug,
        comments = comments.len(),
        likes,
        "post detail assembled"
    );

    Ok(Page::new(
        "post-details.html",
        PostDetailContext {
            post: serialize_post_detail(&post, &comments, likes, &tags, config),
            popular_tags,
            most_popular_posts,
        },
    ))
}

#[tracing::instrument(skip(repo, config))]
pub async fn tag_filter_page<R>(
    repo: &R,
    config: &SiteConfig,
    title: &str,
) -> BlogResult<Page<TagFilterContext>>
where
    R: BlogRepository + ?Sized,
{
    let tag = repo.find_tag_by_title(title).await?;

    let posts = popular_posts(repo, config, TAG_PAGE_SIZE, Some(tag.id)).await?;
    let most_popular_posts = popular_posts(repo, config, LIST_SIZE, None).await?;
    let popular_tags = popular_tags(repo).await?;

    Ok(Page::new(
        "posts-list.html",
        TagFilterContext {
            tag: tag.title,
            popular_tags,
            posts,
            most_popular_posts,
        },
    ))
}

pub fn contacts_page() -> Page<ContactsContext> {
    Page::new("contacts.html", ContactsContext::default())
}
