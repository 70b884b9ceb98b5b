//! Fills the database at DATABASE_URL with demo users, tags, posts,
//! comments and likes through the repository write path.

use blog_site::db::{
    self,
    models::{NewComment, NewPost, NewTag, NewUser},
    BlogRepository, PgRepository,
};
use chrono::{Duration, Utc};
use std::env;

const TAGS: &[&str] = &["Rust", "Web", "Databases", "Python"];

async fn seed(repo: &PgRepository, posts: usize) -> Result<(), blog_site::error::BlogError> {
    let editor = repo
        .create_user(NewUser {
            username: "editor".to_string(),
            is_staff: true,
        })
        .await?;

    let mut readers = Vec::new();
    for i in 0..5 {
        readers.push(
            repo.create_user(NewUser {
                username: format!("reader{}", i),
                is_staff: false,
            })
            .await?,
        );
    }

    let mut tag_ids = Vec::new();
    for title in TAGS {
        let tag = repo
            .create_tag(NewTag {
                title: title.to_string(),
            })
            .await?;
        tag_ids.push(tag.id);
    }

    let now = Utc::now();
    for i in 0..posts {
        let post = repo
            .create_post(NewPost {
                title: format!("Demo post #{}", i + 1),
                text: format!(
                    "This is demo post number {}. It exists so the home page, \
                     tag pages and sidebars have something to show.",
                    i + 1
                ),
                slug: format!("demo-post-{}", i + 1),
                image: None,
                published_at: now - Duration::hours(i as i64),
                author_id: editor.id,
                tag_ids: vec![tag_ids[i % tag_ids.len()], tag_ids[(i + 1) % tag_ids.len()]],
            })
            .await?;

        for reader in readers.iter().take(i % (readers.len() + 1)) {
            repo.like_post(post.id, reader.id).await?;
        }
        for (n, reader) in readers.iter().take(i % 3).enumerate() {
            repo.create_comment(NewComment {
                post_id: post.id,
                author_id: reader.id,
                text: format!("Comment {} on post {}", n + 1, i + 1),
                published_at: now - Duration::hours(i as i64) + Duration::minutes(n as i64 + 1),
            })
            .await?;
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_target(false).init();

    if env::var("DATABASE_URL").is_err() {
        eprintln!("Usage: DATABASE_URL=postgres://... cargo run --bin seed [POSTS]");
        std::process::exit(1);
    }
    let posts: usize = env::args()
        .nth(1)
        .and_then(|n| n.parse().ok())
        .unwrap_or(12);

    let pool = match db::init_pool(None).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = db::run_migrations(&pool).await {
        eprintln!("Error running migrations: {}", e);
        std::process::exit(1);
    }

    let repo = PgRepository::new(pool);
    match seed(&repo, posts).await {
        Ok(()) => println!("Seeded {} posts", posts),
        Err(e) => {
            eprintln!("Error seeding database: {}", e);
            std::process::exit(1);
        }
    }
}
