//! PostgreSQL repository (sqlx)
//!
//! Every list and count runs as a single statement. Grouped counts are
//! completed to total mappings with [`GroupedCounts::total`].

use async_trait::async_trait;
use sqlx::PgPool;

use super::models::{
    CommentWithAuthor, NewComment, NewPost, NewTag, NewUser, Post, PostTagRow, Tag, User,
};
use super::repository::{BlogRepository, GroupedCounts};
use super::validation::ValidationError;
use crate::error::{BlogError, BlogResult};

const POST_COLUMNS: &str = r#"
    p.id, p.title, p.text, p.slug, p.image, p.published_at, p.author_id,
    u.username AS author_username
"#;

/// Unique-constraint violations surface as `Conflict`.
fn map_unique(err: sqlx::Error, resource: &'static str, key: &str) -> BlogError {
    let unique = matches!(&err, sqlx::Error::Database(db_err) if db_err.is_unique_violation());
    if unique {
        BlogError::conflict(resource, key)
    } else {
        BlogError::Database(err)
    }
}

#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn grouped(&self, sql: &str, ids: &[i64]) -> BlogResult<GroupedCounts> {
        if ids.is_empty() {
            return Ok(GroupedCounts::default());
        }
        let rows: Vec<(i64, i64)> = sqlx::query_as(sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(GroupedCounts::total(ids, rows))
    }
}

#[async_trait]
impl BlogRepository for PgRepository {
    async fn ping(&self) -> BlogResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn find_post_by_slug(&self, slug: &str) -> BlogResult<Post> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            WHERE p.slug = $1
            "#
        );
        sqlx::query_as::<_, Post>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BlogError::not_found("post", slug))
    }

    async fn find_tag_by_title(&self, title: &str) -> BlogResult<Tag> {
        sqlx::query_as::<_, Tag>("SELECT id, title FROM tags WHERE title = $1")
            .bind(title)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| BlogError::not_found("tag", title))
    }

    async fn top_posts_by_recency(&self, limit: i64) -> BlogResult<Vec<Post>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            ORDER BY p.published_at DESC, p.id DESC
            LIMIT $1
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn top_posts_by_popularity(
        &self,
        limit: i64,
        tag_id: Option<i64>,
    ) -> BlogResult<Vec<Post>> {
        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts p
            JOIN users u ON u.id = p.author_id
            LEFT JOIN post_likes l ON l.post_id = p.id
            WHERE $2::BIGINT IS NULL
               OR EXISTS (
                   SELECT 1 FROM post_tags pt
                   WHERE pt.post_id = p.id AND pt.tag_id = $2
               )
            GROUP BY p.id, u.username
            ORDER BY COUNT(DISTINCT l.user_id) DESC, p.published_at DESC, p.id DESC
            LIMIT $1
            "#
        );
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(limit)
            .bind(tag_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn top_tags_by_popularity(&self, limit: i64) -> BlogResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.title
            FROM tags t
            LEFT JOIN post_tags pt ON pt.tag_id = t.id
            GROUP BY t.id
            ORDER BY COUNT(pt.post_id) DESC, t.title ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn count_comments_grouped_by_post(
        &self,
        post_ids: &[i64],
    ) -> BlogResult<GroupedCounts> {
        self.grouped(
            r#"
            SELECT post_id, COUNT(*)
            FROM comments
            WHERE post_id = ANY($1)
            GROUP BY post_id
            "#,
            post_ids,
        )
        .await
    }

    async fn count_posts_grouped_by_tag(&self, tag_ids: &[i64]) -> BlogResult<GroupedCounts> {
        self.grouped(
            r#"
            SELECT tag_id, COUNT(*)
            FROM post_tags
            WHERE tag_id = ANY($1)
            GROUP BY tag_id
            "#,
            tag_ids,
        )
        .await
    }

    async fn count_likes_grouped_by_post(&self, post_ids: &[i64]) -> BlogResult<GroupedCounts> {
        self.grouped(
            r#"
            SELECT post_id, COUNT(DISTINCT user_id)
            FROM post_likes
            WHERE post_id = ANY($1)
            GROUP BY post_id
            "#,
            post_ids,
        )
        .await
    }

    async fn tags_with_counts_for_posts(&self, post_ids: &[i64]) -> BlogResult<Vec<PostTagRow>> {
        if post_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.title, counts.posts_count
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            JOIN (
                SELECT tag_id, COUNT(*) AS posts_count
                FROM post_tags
                GROUP BY tag_id
            ) counts ON counts.tag_id = t.id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.title ASC
            "#,
        )
        .bind(post_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn tags_of_post(&self, post_id: i64) -> BlogResult<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.title
            FROM tags t
            JOIN post_tags pt ON pt.tag_id = t.id
            WHERE pt.post_id = $1
            ORDER BY t.title ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(tags)
    }

    async fn comments_of_post(&self, post_id: i64) -> BlogResult<Vec<CommentWithAuthor>> {
        let comments = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            SELECT c.id, c.text, c.published_at, u.username AS author_username
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.post_id = $1
            ORDER BY c.published_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    async fn count_likes(&self, post_id: i64) -> BlogResult<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM post_likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn create_user(&self, user: NewUser) -> BlogResult<User> {
        let user = user.validate()?;
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, is_staff)
            VALUES ($1, $2)
            RETURNING id, username, is_staff
            "#,
        )
        .bind(&user.username)
        .bind(user.is_staff)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique(e, "user", &user.username))
    }

    async fn create_tag(&self, tag: NewTag) -> BlogResult<Tag> {
        let tag = tag.validate()?;
        sqlx::query_as::<_, Tag>("INSERT INTO tags (title) VALUES ($1) RETURNING id, title")
            .bind(&tag.title)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_unique(e, "tag", &tag.title))
    }

    async fn create_post(&self, post: NewPost) -> BlogResult<Post> {
        let post = post.validate()?;
        let mut tx = self.pool.begin().await?;

        let author: Option<User> =
            sqlx::query_as("SELECT id, username, is_staff FROM users WHERE id = $1")
                .bind(post.author_id)
                .fetch_optional(&mut *tx)
                .await?;
        let author = match author {
            Some(author) if author.is_staff => author,
            Some(_) => return Err(ValidationError::AuthorNotStaff(post.author_id).into()),
            None => {
                return Err(ValidationError::UnknownReference {
                    resource: "user",
                    id: post.author_id,
                }
                .into())
            }
        };

        let known: Vec<(i64,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(&post.tag_ids)
            .fetch_all(&mut *tx)
            .await?;
        if let Some(missing) = post
            .tag_ids
            .iter()
            .find(|id| !known.iter().any(|(k,)| k == *id))
        {
            return Err(ValidationError::UnknownReference {
                resource: "tag",
                id: *missing,
            }
            .into());
        }

        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO posts (title, text, slug, image, published_at, author_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&post.title)
        .bind(&post.text)
        .bind(&post.slug)
        .bind(&post.image)
        .bind(post.published_at)
        .bind(post.author_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_unique(e, "post", &post.slug))?;

        sqlx::query(
            r#"
            INSERT INTO post_tags (post_id, tag_id)
            SELECT $1, UNNEST($2::BIGINT[])
            "#,
        )
        .bind(id)
        .bind(&post.tag_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Post {
            id,
            title: post.title,
            text: post.text,
            slug: post.slug,
            image: post.image,
            published_at: post.published_at,
            author_id: author.id,
            author_username: author.username,
        })
    }

    async fn create_comment(&self, comment: NewComment) -> BlogResult<CommentWithAuthor> {
        let comment = comment.validate()?;
        let created = sqlx::query_as::<_, CommentWithAuthor>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (post_id, author_id, text, published_at)
                SELECT $1, u.id, $3, $4
                FROM users u
                WHERE u.id = $2 AND EXISTS (SELECT 1 FROM posts WHERE id = $1)
                RETURNING id, author_id, text, published_at
            )
            SELECT i.id, i.text, i.published_at, u.username AS author_username
            FROM inserted i
            JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.published_at)
        .fetch_optional(&self.pool)
        .await?;

        created.ok_or_else(|| {
            ValidationError::UnknownReference {
                resource: "post or user",
                id: comment.post_id,
            }
            .into()
        })
    }

    async fn like_post(&self, post_id: i64, user_id: i64) -> BlogResult<()> {
        sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let dangling =
                matches!(&e, sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation());
            if dangling {
                BlogError::from(ValidationError::UnknownReference {
                    resource: "post or user",
                    id: post_id,
                })
            } else {
                BlogError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn delete_post(&self, slug: &str) -> BlogResult<()> {
        let result = sqlx::query("DELETE FROM posts WHERE slug = $1")
            .bind(slug)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(BlogError::not_found("post", slug));
        }
        Ok(())
    }
}
