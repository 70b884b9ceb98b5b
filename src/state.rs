//! Application state shared across handlers

use std::sync::Arc;

use crate::config::SiteConfig;
use crate::db::BlogRepository;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    repo: Arc<dyn BlogRepository>,
    config: SiteConfig,
}

impl AppState {
    pub fn new(repo: Arc<dyn BlogRepository>, config: SiteConfig) -> Self {
        Self {
            inner: Arc::new(AppStateInner { repo, config }),
        }
    }

    pub fn repo(&self) -> &dyn BlogRepository {
        self.inner.repo.as_ref()
    }

    pub fn config(&self) -> &SiteConfig {
        &self.inner.config
    }
}
