use std::sync::Arc;

use crate::config::AppConfig;
use crate::lifecycle::SightingService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: Arc<SightingService>,
}
