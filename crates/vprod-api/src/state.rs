//! Application state.

use std::sync::Arc;

use vprod_pipeline::{JobStore, Pipeline, PipelineConfig, PipelineResult};

use crate::config::ApiConfig;

/// Shared application state.
///
/// The job store is created once here and injected into both the request
/// handlers and the background pipeline tasks.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub store: Arc<JobStore>,
    pub pipeline: Arc<Pipeline>,
}

impl AppState {
    /// Create new application state.
    pub fn new(config: ApiConfig, pipeline_config: PipelineConfig) -> PipelineResult<Self> {
        let store = Arc::new(JobStore::new());
        let pipeline = Arc::new(Pipeline::new(pipeline_config, Arc::clone(&store))?);

        Ok(Self {
            config,
            store,
            pipeline,
        })
    }

    /// Build state around an existing pipeline (test seam).
    pub fn with_pipeline(config: ApiConfig, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            store: Arc::clone(pipeline.store()),
            pipeline,
        }
    }
}
