#![allow(dead_code)]

use cmdstream::config::ExecutionSettings;
use cmdstream::types::PersistMode;

/// Builder for `ExecutionSettings` to simplify test setup.
pub struct ExecutionSettingsBuilder {
    settings: ExecutionSettings,
}

impl ExecutionSettingsBuilder {
    pub fn new() -> Self {
        Self {
            settings: ExecutionSettings::default(),
        }
    }

    pub fn shell(mut self, shell: &str) -> Self {
        self.settings.shell = shell.to_string();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.settings.chunk_size = size;
        self
    }

    pub fn persist_mode(mut self, mode: PersistMode) -> Self {
        self.settings.persist_mode = mode;
        self
    }

    pub fn max_concurrent(mut self, n: usize) -> Self {
        self.settings.max_concurrent = n;
        self
    }

    pub fn build(self) -> ExecutionSettings {
        self.settings
    }
}

impl Default for ExecutionSettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
