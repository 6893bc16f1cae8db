use std::sync::Arc;

use url::Url;

#[derive(Clone)]
pub struct AppState {
    state: Arc<AppStateInner>,
}

impl AppState {
    pub fn new(app_config: AppConfig, pool: filmes_dal::Pool) -> Self {
        AppState {
            state: Arc::new(AppStateInner { app_config, pool }),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.state.app_config
    }

    pub fn build_url(&self, relative_url: &str) -> Result<Url, url::ParseError> {
        let base = &self.config().base_url;
        base.join(relative_url)
    }

    pub fn pool(&self) -> &filmes_dal::Pool {
        &self.state.pool
    }
}

impl axum::extract::FromRef<AppState> for () {
    fn from_ref(_: &AppState) {}
}

struct AppStateInner {
    pool: filmes_dal::Pool,
    app_config: AppConfig,
}

pub struct AppConfig {
    pub base_url: Url,
}
