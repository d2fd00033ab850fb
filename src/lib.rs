pub mod aggregator;
pub mod commands;
pub mod core;
pub mod db;
pub mod detection;
pub mod extraction;
pub mod matcher;
pub mod providers;
pub mod security;
pub mod validation;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use aggregator::PetitionAggregator;
use crate::core::{config::EngineConfig, errors::AppResult};
use db::Database;
use extraction::FieldExtractor;
use matcher::{VoterMatcher, VoterRoll};
use providers::gemini::GeminiClient;
use validation::ValidationEngine;

fn log_filter_from_env() -> String {
    std::env::var("PETITION_LOG")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| "info".to_string())
        .to_ascii_lowercase()
}

fn sqlx_debug_enabled() -> bool {
    matches!(
        std::env::var("PETITION_SQLX_DEBUG")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Installs the global `tracing` subscriber. Safe to call more than once;
/// only the first call takes effect.
pub fn init_tracing() {
    let mut filter =
        EnvFilter::try_new(log_filter_from_env()).unwrap_or_else(|_| EnvFilter::new("info"));
    if !sqlx_debug_enabled() {
        if let Ok(directive) = "sqlx::query=warn".parse() {
            filter = filter.add_directive(directive);
        }
    }
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: ValidationEngine,
    pub aggregator: PetitionAggregator,
    pub config: EngineConfig,
}

impl AppState {
    pub fn new(
        db: Database,
        config: EngineConfig,
        roll: Arc<dyn VoterRoll>,
        extractor: Arc<dyn FieldExtractor>,
    ) -> Self {
        let matcher = VoterMatcher::new(roll, config.lookup_timeout);
        let engine = ValidationEngine::new(extractor, matcher, &config);
        let aggregator = PetitionAggregator::new(db.clone(), config.write_timeout);
        Self {
            db,
            engine,
            aggregator,
            config,
        }
    }

    /// Opens the petition store under `config.data_dir` and reads fields
    /// through Gemini with the key held in the OS keyring.
    pub async fn open(config: EngineConfig, roll: Arc<dyn VoterRoll>) -> AppResult<Self> {
        let db = Database::new(&config.data_dir, config.max_connections).await?;
        let gemini = GeminiClient::new(config.gemini_model.clone(), config.provider_timeout)?;
        Ok(Self::new(db, config, roll, Arc::new(gemini)))
    }
}
