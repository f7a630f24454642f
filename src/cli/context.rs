use std::path::Path;
use std::path::PathBuf;

use action_flow::EngineConfig;

pub struct CliContext {
    config: EngineConfig,
    config_path: Option<PathBuf>,
}

impl CliContext {
    pub fn new(config: EngineConfig, config_path: Option<PathBuf>) -> Self {
        Self {
            config,
            config_path,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// File the configuration was read from; `None` when only defaults and environment apply
    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }
}
