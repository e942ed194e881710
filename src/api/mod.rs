pub mod download;
pub mod error;
pub mod health;

use crate::services::DownloadService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub download_service: Arc<DownloadService>,
}
