//! Shared application state for the API server.
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use w2g_core::{ExecutionContext, PipelineRunner, ResultSink, W2gConfig};
use w2g_results::JsonFileSink;
use w2g_stages::{Collaborators, StageSet};
use w2g_vision::{GroqClient, VisionDescriber};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub stages: StageSet,
    pub pipeline: Arc<PipelineRunner>,
    pub sink: Arc<dyn ResultSink>,
    /// Result store the dashboard reads back.
    pub results_path: PathBuf,
    /// Plain-text run log the activity feed parses.
    pub log_path: PathBuf,
    pub max_graph_steps: usize,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: &W2gConfig,
        stages: StageSet,
        sink: Arc<dyn ResultSink>,
    ) -> anyhow::Result<Self> {
        let pipeline = Arc::new(stages.pipeline());
        Ok(Self {
            stages,
            pipeline,
            sink,
            results_path: config.results.path.clone(),
            log_path: config.logging.file_path(),
            max_graph_steps: config.graph.max_steps,
            metrics: Metrics::new().context("failed to register metrics")?,
        })
    }

    /// Stages backed by the configured model endpoint and a JSON result store.
    ///
    /// Builds a blocking HTTP client, so call it outside the async runtime.
    pub fn from_config(config: &W2gConfig) -> anyhow::Result<Self> {
        let stages = StageSet::from_config(config, live_collaborators(config)?);
        let sink = Arc::new(JsonFileSink::new(config.results.path.clone()));
        Self::new(config, stages, sink)
    }

    pub fn context(&self) -> ExecutionContext {
        ExecutionContext::with_max_steps(self.max_graph_steps)
    }
}

/// Groq-backed model seams with simulated transfer and reward dispatch.
pub fn live_collaborators(config: &W2gConfig) -> anyhow::Result<Collaborators> {
    let client = Arc::new(
        GroqClient::from_config(&config.validator).context("failed to build model client")?,
    );
    let describer = Arc::new(VisionDescriber::new(client.clone()));
    Ok(Collaborators::simulated(client, describer))
}
