//! Site configuration read from the environment (and `.env`).

use std::net::SocketAddr;

pub(crate) fn env_or<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub host: String,
    pub port: u16,
    /// Public URL prefix for uploaded images, always ending in `/`.
    pub media_url: String,
    /// Directory the media files are served from.
    pub media_root: String,
    pub allowed_origins: Vec<String>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env_or("PORT", 8000),
            media_url: normalize_media_url(
                &std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media/".to_string()),
            ),
            media_root: std::env::var("MEDIA_ROOT").unwrap_or_else(|_| "media".to_string()),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|origin| origin.trim().to_string())
                        .filter(|origin| !origin.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

impl SiteConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    /// Public URL of a stored image path.
    pub fn media_url_for(&self, image: &str) -> String {
        format!("{}{}", self.media_url, image.trim_start_matches('/'))
    }
}

fn normalize_media_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
