use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use batchwire_core::FeatureSpecSet;
use serde::{Deserialize, Serialize};

/// Input and output contracts of one deployment.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentSpecs {
    pub inputs: FeatureSpecSet,
    pub outputs: FeatureSpecSet,
}

/// Looks up the feature specs of a named deployment.
#[async_trait]
pub trait SpecSource: Send + Sync {
    async fn feature_specs(&self, deployment: &str) -> Result<DeploymentSpecs>;
}

/// Serves specs registered up front.
#[derive(Clone, Debug, Default)]
pub struct StaticSpecs {
    specs: HashMap<String, DeploymentSpecs>,
}

impl StaticSpecs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, deployment: impl Into<String>, specs: DeploymentSpecs) -> Self {
        self.specs.insert(deployment.into(), specs);
        self
    }
}

#[async_trait]
impl SpecSource for StaticSpecs {
    async fn feature_specs(&self, deployment: &str) -> Result<DeploymentSpecs> {
        self.specs
            .get(deployment)
            .cloned()
            .ok_or_else(|| anyhow!("unknown deployment: {deployment}"))
    }
}
