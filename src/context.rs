//! The application context: every long-lived collaborator, built once at
//! start-up and shared by reference with each request.

use crate::config::ServiceConfig;
use crate::error::{HistoryError, StartupError};
use crate::history::HistoryStore;
use crate::ingest::IngestionOrchestrator;
use crate::pipeline::analyze::{DamageAnalyzer, VisionAnalyzer};
use crate::report::ReportRenderer;
use std::sync::Arc;
use tracing::info;

pub struct AppContext {
    pub config: ServiceConfig,
    pub history: Arc<HistoryStore>,
    pub orchestrator: IngestionOrchestrator,
    pub renderer: ReportRenderer,
}

impl AppContext {
    /// Resolve the LLM provider from `config` and open the history store.
    pub async fn from_config(config: ServiceConfig) -> Result<Self, StartupError> {
        let analyzer = VisionAnalyzer::from_config(&config)?;
        Ok(Self::with_analyzer(config, Arc::new(analyzer)).await?)
    }

    /// Build around an explicit analyzer.
    pub async fn with_analyzer(
        config: ServiceConfig,
        analyzer: Arc<dyn DamageAnalyzer>,
    ) -> Result<Self, HistoryError> {
        let history = Arc::new(HistoryStore::open(&config.history_path).await?);
        let orchestrator = IngestionOrchestrator::new(&config, analyzer, Arc::clone(&history));
        info!(
            "Context ready: history={}, uploads={}",
            history.path().display(),
            config.upload_dir.display()
        );
        Ok(Self {
            config,
            history,
            orchestrator,
            renderer: ReportRenderer::new(),
        })
    }
}
