// src/api/state.rs
use crate::annotator::Annotator;
use crate::config::AppConfig;
use crate::errors::Result;
use crate::providers::Provider;
use reqwest::Client;
use std::sync::Arc;

/// Read-only state shared by every request.
pub struct AppState<P = Provider> {
    pub config: Arc<AppConfig>,
    pub provider: Arc<P>,
    pub annotator: Arc<Annotator>,
}

impl<P> Clone for AppState<P> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
            provider: Arc::clone(&self.provider),
            annotator: Arc::clone(&self.annotator),
        }
    }
}

impl AppState<Provider> {
    /// Builds the configured provider and resolves the banner font once.
    pub fn new(config: AppConfig) -> Result<Self> {
        let provider = Provider::from_config(&config, Client::new())?;
        log::info!("🤖 Using {} provider", provider.name());
        let annotator = Annotator::with_font_path(config.grading.font_path.as_deref());
        Ok(Self::with_provider(config, provider, annotator))
    }
}

impl<P> AppState<P> {
    pub fn with_provider(config: AppConfig, provider: P, annotator: Annotator) -> Self {
        Self {
            config: Arc::new(config),
            provider: Arc::new(provider),
            annotator: Arc::new(annotator),
        }
    }
}
