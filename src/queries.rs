//! Ordering and count attachment for materialized posts and tags.
//!
//! Callers fetch a page-sized collection first, then attach derived counts
//! with one extra repository call per count kind, whatever the page size.

use std::collections::HashMap;

use crate::db::models::{Post, Tag, TagWithCount};
use crate::db::repository::{BlogRepository, GroupedCounts};
use crate::error::BlogResult;

/// A post with the counts list views show next to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub post: Post,
    pub comments_count: i64,
    /// Tag titles ascending.
    pub tags: Vec<TagWithCount>,
}

impl From<Post> for PostCard {
    fn from(post: Post) -> Self {
        Self {
            post,
            comments_count: 0,
            tags: Vec::new(),
        }
    }
}

fn post_ids(cards: &[PostCard]) -> Vec<i64> {
    cards.iter().map(|card| card.post.id).collect()
}

/// Newest first; equal timestamps fall back to the higher id.
pub fn order_by_recency(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| {
        b.published_at
            .cmp(&a.published_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    posts
}

/// Most liked first; ties keep recency order.
pub fn order_by_popularity(posts: Vec<Post>, likes: &GroupedCounts) -> Vec<Post> {
    let mut posts = order_by_recency(posts);
    // sort_by is stable, so recency survives among equal like counts
    posts.sort_by(|a, b| likes.get(b.id).cmp(&likes.get(a.id)));
    posts
}

/// Most referenced first; ties by title ascending.
pub fn order_by_tag_popularity(mut tags: Vec<Tag>, posts_counts: &GroupedCounts) -> Vec<Tag> {
    tags.sort_by(|a, b| {
        posts_counts
            .get(b.id)
            .cmp(&posts_counts.get(a.id))
            .then_with(|| a.title.cmp(&b.title))
    });
    tags
}

/// Fills `comments_count` on every card from one grouped count.
pub async fn attach_comment_counts<R>(repo: &R, cards: &mut [PostCard]) -> BlogResult<()>
where
    R: BlogRepository + ?Sized,
{
    if cards.is_empty() {
        return Ok(());
    }
    let counts = repo.count_comments_grouped_by_post(&post_ids(cards)).await?;
    for card in cards.iter_mut() {
        card.comments_count = counts.get(card.post.id);
    }
    Ok(())
}

/// Pairs every tag with its post count from one grouped count.
pub async fn attach_tag_counts<R>(repo: &R, tags: Vec<Tag>) -> BlogResult<Vec<TagWithCount>>
where
    R: BlogRepository + ?Sized,
{
    if tags.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<i64> = tags.iter().map(|tag| tag.id).collect();
    let counts = repo.count_posts_grouped_by_tag(&ids).await?;
    Ok(tags
        .into_iter()
        .map(|tag| TagWithCount {
            posts_count: counts.get(tag.id),
            id: tag.id,
            title: tag.title,
        })
        .collect())
}

/// Loads every card's tags, each with its post count, in one batched fetch.
pub async fn attach_post_counts_to_tags_of<R>(repo: &R, cards: &mut [PostCard]) -> BlogResult<()>
where
    R: BlogRepository + ?Sized,
{
    if cards.is_empty() {
        return Ok(());
    }
    let rows = repo.tags_with_counts_for_posts(&post_ids(cards)).await?;

    let mut by_post: HashMap<i64, Vec<TagWithCount>> = HashMap::new();
    for row in rows {
        by_post.entry(row.post_id).or_default().push(row.into_tag());
    }

    for card in cards.iter_mut() {
        let mut tags = by_post.remove(&card.post.id).unwrap_or_default();
        tags.sort_by(|a, b| a.title.cmp(&b.title));
        card.tags = tags;
    }
    Ok(())
}

/// Wraps posts into cards with comment counts and counted tags attached.
pub async fn hydrate_posts<R>(repo: &R, posts: Vec<Post>) -> BlogResult<Vec<PostCard>>
where
    R: BlogRepository + ?Sized,
{
    let mut cards: Vec<PostCard> = posts.into_iter().map(PostCard::from).collect();
    attach_post_counts_to_tags_of(repo, &mut cards).await?;
    attach_comment_counts(repo, &mut cards).await?;
    Ok(cards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryRepository;
    use crate::db::models::{NewComment, NewPost, NewTag, NewUser};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn post(id: i64, minutes: i64) -> Post {
        Post {
            id,
            title: format!("Post {}", id),
            text: String::new(),
            slug: format!("post-{}", id),
            image: None,
            published_at: at(minutes),
            author_id: 1,
            author_username: "author".to_string(),
        }
    }

    fn tag(id: i64, title: &str) -> Tag {
        Tag {
            id,
            title: title.to_string(),
        }
    }

    async fn seeded() -> (MemoryRepository, Vec<Post>) {
        let repo = MemoryRepository::new();
        let author = repo
            .create_user(NewUser {
                username: "admin".to_string(),
                is_staff: true,
            })
            .await
            .unwrap();
        let rust = repo
            .create_tag(NewTag {
                title: "Rust".to_string(),
            })
            .await
            .unwrap();
        let web = repo
            .create_tag(NewTag {
                title: "web".to_string(),
            })
            .await
            .unwrap();

        let mut posts = Vec::new();
        for (i, tags) in [vec![rust.id, web.id], vec![web.id], vec![rust.id]]
            .into_iter()
            .enumerate()
        {
            let created = repo
                .create_post(NewPost {
                    title: format!("Post {}", i),
                    text: "text".to_string(),
                    slug: format!("post-{}", i),
                    image: None,
                    published_at: at(i as i64),
                    author_id: author.id,
                    tag_ids: tags,
                })
                .await
                .unwrap();
            posts.push(created);
        }

        for minutes in 0..2 {
            repo.create_comment(NewComment {
                post_id: posts[0].id,
                author_id: author.id,
                text: "nice".to_string(),
                published_at: at(10 + minutes),
            })
            .await
            .unwrap();
        }
        (repo, posts)
    }

    #[test]
    fn test_order_by_recency_newest_first() {
        let ordered = order_by_recency(vec![post(1, 5), post(2, 30), post(3, 10)]);
        let ids: Vec<i64> = ordered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }

    #[test]
    fn test_order_by_recency_equal_timestamps_by_id() {
        let ordered = order_by_recency(vec![post(1, 5), post(7, 5), post(4, 5)]);
        let ids: Vec<i64> = ordered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![7, 4, 1]);
    }

    #[test]
    fn test_order_by_popularity_is_non_increasing() {
        let posts = vec![post(1, 0), post(2, 1), post(3, 2), post(4, 3)];
        let likes = GroupedCounts::total(&[1, 2, 3, 4], vec![(1, 3), (2, 9), (4, 3)]);
        let ordered = order_by_popularity(posts, &likes);

        for pair in ordered.windows(2) {
            assert!(likes.get(pair[0].id) >= likes.get(pair[1].id));
        }
        // equal like counts: newer post first
        let ids: Vec<i64> = ordered.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_order_by_tag_popularity() {
        let tags = vec![tag(1, "b"), tag(2, "a"), tag(3, "c")];
        let counts = GroupedCounts::total(&[1, 2, 3], vec![(1, 2), (2, 2), (3, 5)]);
        let ordered = order_by_tag_popularity(tags, &counts);
        let titles: Vec<&str> = ordered.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_attach_comment_counts_defaults_to_zero() {
        let (repo, posts) = seeded().await;
        let mut cards: Vec<PostCard> = posts.into_iter().map(PostCard::from).collect();
        attach_comment_counts(&repo, &mut cards).await.unwrap();

        let counts: Vec<i64> = cards.iter().map(|c| c.comments_count).collect();
        assert_eq!(counts, vec![2, 0, 0]);
    }

    #[tokio::test]
    async fn test_attach_tag_counts_defaults_to_zero() {
        let (repo, _) = seeded().await;
        let lonely = repo
            .create_tag(NewTag {
                title: "lonely".to_string(),
            })
            .await
            .unwrap();
        let rust = repo.find_tag_by_title("rust").await.unwrap();

        let counted = attach_tag_counts(&repo, vec![rust, lonely]).await.unwrap();
        assert_eq!(counted[0].posts_count, 2);
        assert_eq!(counted[1].title, "lonely");
        assert_eq!(counted[1].posts_count, 0);
    }

    #[tokio::test]
    async fn test_attach_post_counts_to_tags_of() {
        let (repo, posts) = seeded().await;
        let mut cards: Vec<PostCard> = posts.into_iter().map(PostCard::from).collect();
        attach_post_counts_to_tags_of(&repo, &mut cards).await.unwrap();

        let first: Vec<(&str, i64)> = cards[0]
            .tags
            .iter()
            .map(|t| (t.title.as_str(), t.posts_count))
            .collect();
        assert_eq!(first, vec![("rust", 2), ("web", 2)]);
        assert_eq!(cards[1].tags.len(), 1);
        assert_eq!(cards[1].tags[0].title, "web");
    }

    #[tokio::test]
    async fn test_hydrate_empty_collection() {
        let repo = MemoryRepository::new();
        let cards = hydrate_posts(&repo, Vec::new()).await.unwrap();
        assert!(cards.is_empty());
        let tags = attach_tag_counts(&repo, Vec::new()).await.unwrap();
        assert!(tags.is_empty());
    }
}
