//! Configuration module for dirflow
//!
//! This module provides the engine settings shared by every watcher and the
//! declarative rule file consumed by the command line front end. Configuration
//! can be loaded from TOML files and/or environment variables.

mod defaults;
mod loading;


use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use defaults::*;

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.dirflow/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".dirflow").join("config.toml"))
}

/// Engine level settings applied to every watcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherSettings {
    /// Capacity of the channel between the notification source and the dispatcher
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Whether subdirectories of the watched root are included
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Window for coalescing duplicate events in milliseconds (0 disables debouncing)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Create the watched directory when it does not exist
    #[serde(default = "default_create_missing_dirs")]
    pub create_missing_dirs: bool,
}

impl WatcherSettings {
    /// Create settings with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings from builder
    pub fn builder() -> WatcherSettingsBuilder {
        WatcherSettingsBuilder::default()
    }

    /// Get the debounce duration, if debouncing is enabled
    pub fn debounce_duration(&self) -> Option<Duration> {
        (self.debounce_ms > 0).then(|| Duration::from_millis(self.debounce_ms))
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.channel_capacity == 0 {
            return Err(Error::config(
                "watcher.channel_capacity must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            channel_capacity: default_channel_capacity(),
            recursive: default_recursive(),
            debounce_ms: default_debounce_ms(),
            create_missing_dirs: default_create_missing_dirs(),
        }
    }
}

/// Builder for WatcherSettings
#[derive(Debug, Default)]
pub struct WatcherSettingsBuilder {
    settings: WatcherSettings,
}

impl WatcherSettingsBuilder {
    /// Set the channel capacity
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.settings.channel_capacity = capacity;
        self
    }

    /// Set whether subdirectories are watched
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.settings.recursive = recursive;
        self
    }

    /// Set debounce window in milliseconds
    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.settings.debounce_ms = ms;
        self
    }

    /// Set whether missing directories are created
    pub fn create_missing_dirs(mut self, create: bool) -> Self {
        self.settings.create_missing_dirs = create;
        self
    }

    /// Build the settings
    pub fn build(self) -> WatcherSettings {
        self.settings
    }
}

/// Operation a configured rule responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperation {
    Created,
    Changed,
    Deleted,
    Renamed,
}

/// How the patterns of a configured rule are combined
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleLogic {
    /// Every pattern must match
    #[default]
    And,
    /// At least one pattern must match
    Or,
}

/// A built-in pipeline step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepConfig {
    /// Log the matched event
    Log,
    /// Copy the matched file into a directory
    Copy { destination: PathBuf },
    /// Move the matched file into a directory
    Move { destination: PathBuf },
    /// Delete the matched file
    Delete,
}

/// A single rule in the rule file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Operation the rule is bound to
    pub operation: RuleOperation,

    /// File name patterns (`*` and `?` wildcards)
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Pattern combination logic
    #[serde(default)]
    pub logic: RuleLogic,

    /// Steps executed in order when the rule matches
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

/// A watched directory together with its rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryConfig {
    /// Directory root
    pub path: PathBuf,

    /// Rules applied to events under `path`
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

/// Main configuration structure for dirflow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Engine settings
    #[serde(default)]
    pub watcher: WatcherSettings,

    /// Watched directories
    #[serde(default)]
    pub directories: Vec<DirectoryConfig>,
}

impl Config {
    /// Validate the configuration
    ///
    /// Fails fast on anything that would otherwise surface only once watching
    /// has started: blank paths, duplicate directories, blank patterns and
    /// steps without a destination.
    pub fn validate(&self) -> Result<()> {
        self.watcher.validate()?;

        if self.directories.is_empty() {
            return Err(Error::config(
                "At least one [[directories]] entry is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for directory in &self.directories {
            if is_blank(&directory.path) {
                return Err(Error::invalid_input(
                    "Directory path cannot be empty".to_string(),
                ));
            }
            let absolute = std::path::absolute(&directory.path).map_err(|e| {
                Error::invalid_input(format!(
                    "Cannot resolve directory path {}: {e}",
                    directory.path.display()
                ))
            })?;
            if !seen.insert(absolute) {
                return Err(Error::duplicate_path(directory.path.clone()));
            }

            for (index, rule) in directory.rules.iter().enumerate() {
                if rule.patterns.iter().any(|p| p.trim().is_empty()) {
                    return Err(Error::config(format!(
                        "Rule {index} under {} has a blank pattern",
                        directory.path.display()
                    )));
                }
                for step in &rule.steps {
                    if let StepConfig::Copy { destination } | StepConfig::Move { destination } =
                        step
                    {
                        if is_blank(destination) {
                            return Err(Error::config(format!(
                                "Rule {index} under {} has a step without a destination",
                                directory.path.display()
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, toml_string)
            .map_err(|e| Error::config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }
}

fn is_blank(path: &Path) -> bool {
    path.as_os_str().to_string_lossy().trim().is_empty()
}
