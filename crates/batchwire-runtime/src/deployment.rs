use std::sync::Arc;

use anyhow::{Context, Result};
use batchwire_core::{decode_record, encode_record, FeatureSpecSet, Record};
use tracing::{debug, info};

use crate::{
    BatchScheduler, ConfigError, DeploymentSpecs, LazyPredictionSequence, PredictionError,
    ResultHandle, SchedulerConfig, SchedulerStats, SpecSource, Transport,
};

/// One remote endpoint with its feature contracts and its own scheduler.
///
/// Dropping the deployment shuts its scheduler down once every lazy sequence
/// created from it is gone; queued items are still sent. Call
/// [`Deployment::shutdown`] to wait for that to finish.
pub struct Deployment {
    endpoint: String,
    inputs: Arc<FeatureSpecSet>,
    outputs: Arc<FeatureSpecSet>,
    config: SchedulerConfig,
    scheduler: Arc<BatchScheduler>,
}

impl Deployment {
    /// Must be called from within a tokio runtime.
    pub fn new(
        endpoint: impl Into<String>,
        specs: DeploymentSpecs,
        transport: impl Transport,
        config: SchedulerConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let endpoint = endpoint.into();
        let scheduler = BatchScheduler::new(Arc::new(transport), config.batch_policy());
        info!(
            endpoint = %endpoint,
            inputs = specs.inputs.len(),
            outputs = specs.outputs.len(),
            "deployment ready"
        );
        Ok(Self {
            endpoint,
            inputs: Arc::new(specs.inputs),
            outputs: Arc::new(specs.outputs),
            config,
            scheduler: Arc::new(scheduler),
        })
    }

    /// Fetches the feature specs from `source`, then builds the deployment.
    pub async fn discover(
        endpoint: impl Into<String>,
        source: &dyn SpecSource,
        transport: impl Transport,
        config: SchedulerConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let specs = source
            .feature_specs(&endpoint)
            .await
            .with_context(|| format!("fetching feature specs for {endpoint}"))?;
        Ok(Self::new(endpoint, specs, transport, config)?)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn feature_specs_in(&self) -> &FeatureSpecSet {
        &self.inputs
    }

    pub fn feature_specs_out(&self) -> &FeatureSpecSet {
        &self.outputs
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Predicts every record and returns the outputs in input order.
    ///
    /// All records are encoded before anything is submitted, so an invalid
    /// record fails the call without any network traffic. Otherwise the first
    /// failing item, in input order, is returned.
    pub async fn predict(&self, records: &[Record]) -> Result<Vec<Record>, PredictionError> {
        let items = records
            .iter()
            .map(|r| encode_record(r, &self.inputs))
            .collect::<Result<Vec<_>, _>>()?;

        let handles: Vec<ResultHandle> = items
            .into_iter()
            .map(|item| self.scheduler.submit(item))
            .collect();
        self.scheduler.flush();
        debug!(endpoint = %self.endpoint, items = handles.len(), "predict submitted");

        let mut out = Vec::with_capacity(handles.len());
        for handle in handles {
            let row = handle.await?;
            out.push(decode_record(&row, &self.outputs)?);
        }
        Ok(out)
    }

    pub async fn predict_one(&self, record: Record) -> Result<Record, PredictionError> {
        let mut out = self.predict(std::slice::from_ref(&record)).await?;
        out.pop().ok_or(PredictionError::SchedulerClosed)
    }

    /// Returns immediately; records are submitted only as the sequence is pulled.
    pub fn predict_lazy(&self, records: impl IntoIterator<Item = Record>) -> LazyPredictionSequence {
        LazyPredictionSequence::new(
            Arc::clone(&self.scheduler),
            Arc::clone(&self.inputs),
            Arc::clone(&self.outputs),
            records.into_iter().collect(),
            self.config.look_ahead_window,
        )
    }

    /// Sends anything still queued and waits for in-flight batches.
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        info!(endpoint = %self.endpoint, "deployment shut down");
    }
}
