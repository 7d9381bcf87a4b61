pub mod config;
pub mod controllers;
pub mod error;
pub mod geo;
pub mod models;
pub mod services;
pub mod views;

use std::sync::Arc;

use crate::error::ApiError;
use crate::services::api_client::CinemaApiClient;

// Shared state для всех команд CLI
#[derive(Clone)]
pub struct AppState {
    pub config: config::Config,
    pub api: CinemaApiClient,
}

impl AppState {
    pub fn new(config: config::Config) -> Result<Arc<Self>, ApiError> {
        let api = CinemaApiClient::from_config(&config)?;
        tracing::debug!("API client configured for {}", config.api.base_url);
        Ok(Arc::new(Self { config, api }))
    }
}
