use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for local development
    Pretty,
    /// One JSON object per line
    Json,
}

/// Logging settings derived from the environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub environment: String,
    pub level: String,
    pub directory: String,
    pub format: LogFormat,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let environment =
            std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        Self::for_environment(
            environment,
            std::env::var("LOG_LEVEL").ok(),
            std::env::var("LOG_DIR").ok(),
        )
    }

    pub fn for_environment(
        environment: String,
        level: Option<String>,
        directory: Option<String>,
    ) -> Self {
        let is_production = environment == "production";
        Self {
            level: level.unwrap_or_else(|| {
                if is_production { "info" } else { "debug" }.to_string()
            }),
            directory: directory.unwrap_or_else(|| "logs".to_string()),
            format: if is_production {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            environment,
        }
    }

    /// Default filter when `RUST_LOG` is not set
    pub fn filter_directive(&self) -> String {
        format!(
            "blog_site={},tower_http=debug,axum=debug,sqlx=warn",
            self.level
        )
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_defaults() {
        let config = LogConfig::for_environment("production".to_string(), None, None);
        assert_eq!(config.level, "info");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directory, "logs");
    }

    #[test]
    fn test_development_defaults_and_overrides() {
        let config = LogConfig::for_environment(
            "development".to_string(),
            Some("trace".to_string()),
            Some("/tmp/blog-logs".to_string()),
        );
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(
            config.filter_directive(),
            "blog_site=trace,tower_http=debug,axum=debug,sqlx=warn"
        );
        assert_eq!(config.directory, "/tmp/blog-logs");
    }
}
