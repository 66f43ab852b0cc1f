use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::llm::gemini::GeminiImageClient;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub model: Arc<GeminiImageClient>,
}

impl AppState {
    pub fn new(config: Config, db: Database) -> Self {
        let model = Arc::new(GeminiImageClient::from_config(&config));
        AppState {
            config: Arc::new(config),
            db,
            model,
        }
    }
}
