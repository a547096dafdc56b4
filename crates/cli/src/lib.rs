//! Library interface for the dirflow CLI
//!
//! Turns a loaded rule file into configured watchers. Kept separate from
//! main.rs so integration tests can drive it directly.

use dirflow_core::config::{Config, DirectoryConfig, RuleConfig, RuleLogic, StepConfig};
use dirflow_watcher::{
    CopyToStep, DeleteStep, FileWatcher, LogStep, MoveToStep, RuleBuilder, WatcherBuilder,
    WatcherCompositor,
};

pub use anyhow::Result;

/// Register every configured directory with a compositor
pub fn compositor_from_config(config: &Config) -> Result<WatcherCompositor> {
    let mut compositor = WatcherCompositor::with_settings(config.watcher.clone());

    for directory in &config.directories {
        compositor.for_path(&directory.path, |watcher| {
            configure_directory(watcher, directory)
        })?;
    }

    Ok(compositor)
}

/// Validate `config`, then build and start a watcher per directory
pub async fn start_watchers(config: &Config) -> Result<Vec<FileWatcher>> {
    config.validate()?;
    let watchers = compositor_from_config(config)?.compose().await?;
    Ok(watchers)
}

fn configure_directory(watcher: WatcherBuilder, directory: &DirectoryConfig) -> WatcherBuilder {
    directory.rules.iter().fold(watcher, |watcher, rule| {
        watcher.rule(rule.operation.into(), |builder| configure_rule(builder, rule))
    })
}

fn configure_rule(builder: RuleBuilder, rule: &RuleConfig) -> RuleBuilder {
    let builder = rule
        .patterns
        .iter()
        .fold(builder, |builder, pattern| builder.filter(pattern.as_str()));

    let builder = match rule.logic {
        RuleLogic::And => builder.use_and_logic(),
        RuleLogic::Or => builder.use_or_logic(),
    };

    rule.steps
        .iter()
        .fold(builder, |builder, step| match step {
            StepConfig::Log => builder.add_step_with(LogStep),
            StepConfig::Copy { destination } => {
                builder.add_step_with(CopyToStep::new(destination))
            }
            StepConfig::Move { destination } => {
                builder.add_step_with(MoveToStep::new(destination))
            }
            StepConfig::Delete => builder.add_step_with(DeleteStep),
        })
}

/// One line per directory and rule, printed by `dirflow check`
pub fn describe(config: &Config) -> Vec<String> {
    let mut lines = Vec::new();
    for directory in &config.directories {
        lines.push(format!(
            "{} ({} rules)",
            directory.path.display(),
            directory.rules.len()
        ));
        for rule in &directory.rules {
            lines.push(format!(
                "  {:?} {:?} [{}] -> {} steps",
                rule.operation,
                rule.logic,
                rule.patterns.join(", "),
                rule.steps.len()
            ));
        }
    }
    lines
}
