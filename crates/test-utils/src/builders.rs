#![allow(dead_code)]

use std::collections::BTreeMap;
use modflow::config::{AccessDecl, ConfigFile, ModuleSection, RawConfigFile, RuntimeSection};
use modflow::types::ExecutionAffinity;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                runtime: RuntimeSection::default(),
                module: BTreeMap::new(),
            },
        }
    }

    pub fn with_module(mut self, name: &str, module: ModuleSection) -> Self {
        self.config.module.insert(name.to_string(), module);
        self
    }

    pub fn with_multithreading(mut self, num_threads: usize) -> Self {
        self.config.runtime.multithreading = true;
        self.config.runtime.num_threads = num_threads;
        self
    }

    pub fn with_default_max_exec_time(mut self, duration: &str) -> Self {
        self.config.runtime.max_exec_time = Some(duration.to_string());
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }

    /// The raw config without validation, for tests that exercise the
    /// validation itself.
    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ModuleSection`.
pub struct ModuleSectionBuilder {
    module: ModuleSection,
}

impl ModuleSectionBuilder {
    pub fn new() -> Self {
        Self {
            module: ModuleSection::default(),
        }
    }

    pub fn main_thread_only(mut self) -> Self {
        self.module.affinity = ExecutionAffinity::MainThreadOnly;
        self
    }

    pub fn max_exec_time(mut self, duration: &str) -> Self {
        self.module.max_exec_time = Some(duration.to_string());
        self
    }

    pub fn reads(mut self, channel: &str, priority: i32) -> Self {
        self.module.reads.push(AccessDecl {
            channel: channel.to_string(),
            priority,
        });
        self
    }

    pub fn writes(mut self, channel: &str, priority: i32) -> Self {
        self.module.writes.push(AccessDecl {
            channel: channel.to_string(),
            priority,
        });
        self
    }

    pub fn build(self) -> ModuleSection {
        self.module
    }
}

impl Default for ModuleSectionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
