use std::collections::BTreeMap;

use crate::config::{Config, OutputConfig};
use crate::disposition::DispositionPolicy;
use crate::storage::OutputLayout;

pub struct PipelineConfig {
    pub worker_id: String,
    pub layout: OutputLayout,
    pub output: OutputConfig,
    pub policy: DispositionPolicy,
    pub worker_settings: BTreeMap<String, serde_json::Value>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            worker_id: config.worker_id.clone(),
            layout: OutputLayout::from_config(&config.file_system),
            output: config.output.clone(),
            policy: DispositionPolicy::from_config(config),
            worker_settings: config.worker_settings.clone(),
        }
    }
}
