//! Blog site - library for app logic and testing

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod pages;
pub mod queries;
pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    services::ServeDir,
    trace::TraceLayer,
};

use config::SiteConfig;
use db::{BlogRepository, DbConfig, MemoryRepository, PgRepository};
use state::AppState;

/// Configure CORS from `ALLOWED_ORIGINS`.
/// With no origins configured, cross-origin requests are not allowed.
pub fn configure_cors(config: &SiteConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::HEAD])
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors(state.config());
    let media = ServeDir::new(&state.config().media_root);

    Router::new()
        .route("/", get(routes::blog::index))
        .route("/posts/{slug}/", get(routes::blog::post_detail))
        .route("/tags/{tag_title}/", get(routes::blog::tag_filter))
        .route("/contacts/", get(routes::blog::contacts))
        .route("/health", get(routes::health::health_ping))
        .route("/health/ready", get(routes::health::health_ready))
        .nest_service("/media", media)
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        // Read-only site: nothing legitimate sends a large body
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(cors)
}

/// Postgres when a database is configured, otherwise an empty in-memory
/// store. A configured but unreachable database is an error, never a
/// silent switch to the in-memory store.
async fn build_repository(
    database: Option<DbConfig>,
) -> Result<Arc<dyn BlogRepository>, sqlx::Error> {
    let Some(db_config) = database else {
        tracing::info!("DATABASE_URL not set. Serving from an empty in-memory store.");
        let repo: Arc<dyn BlogRepository> = Arc::new(MemoryRepository::new());
        return Ok(repo);
    };

    let pool = db::init_pool(Some(db_config)).await.map_err(|e| {
        tracing::error!("Failed to initialize database pool: {}", e);
        e
    })?;
    db::run_migrations(&pool).await.map_err(|e| {
        tracing::error!("Failed to run database migrations: {}", e);
        e
    })?;

    let repo: Arc<dyn BlogRepository> = Arc::new(PgRepository::new(pool));
    Ok(repo)
}

/// Run the server (used by main).
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Guards flush buffered log lines on drop; keep them for the whole run.
    let _log_guards = logging::init(&logging::config::LogConfig::from_env());

    routes::health::init_start_time();

    let config = SiteConfig::from_env();
    let addr: SocketAddr = config.bind_addr()?;
    let database = std::env::var("DATABASE_URL")
        .ok()
        .map(|_| DbConfig::default());
    let repo = build_repository(database).await?;
    let app = create_app(AppState::new(repo, config));

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_app_returns_router() {
        let state = AppState::new(Arc::new(MemoryRepository::new()), SiteConfig::default());
        let _app = create_app(state);
    }

    #[test]
    fn test_configure_cors_skips_invalid_origins() {
        let mut config = SiteConfig::default();
        config.allowed_origins = vec![
            "https://blog.example.com".to_string(),
            "not a header\n".to_string(),
        ];
        let _cors = configure_cors(&config);
    }

    #[tokio::test]
    async fn test_build_repository_without_database_uses_memory() {
        let repo = build_repository(None).await.unwrap();
        assert!(repo.ping().await.is_ok());
    }

    #[tokio::test]
    async fn test_build_repository_fails_when_database_unreachable() {
        let database = DbConfig {
            url: "postgresql://nobody@127.0.0.1:1/blog".to_string(),
            max_connections: 1,
            min_connections: 0,
            connect_timeout_secs: 1,
            idle_timeout_secs: 1,
        };
        assert!(build_repository(Some(database)).await.is_err());
    }
}
