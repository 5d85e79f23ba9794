use clap::{Parser, Subcommand};
use taskboard_core::config::Theme;
use taskboard_core::error::AppError;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Override configuration values (format KEY=VALUE)
    #[arg(long = "config-override", value_name = "KEY=VALUE", global = true)]
    pub config_override: Vec<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    ///
    /// Example: taskboard add "Buy milk" "Two litres, semi-skimmed"
    Add {
        title: Option<String>,
        description: Option<String>,
    },
    /// Flip a task between pending and completed
    ///
    /// Example: taskboard toggle task-1766221200000000000
    Toggle {
        id: String,
    },
    /// Delete a task
    ///
    /// Example: taskboard delete task-1766221200000000000
    Delete {
        id: String,
    },
    /// Move a pending task into the slot of another pending task
    ///
    /// Example: taskboard move task-3 task-1
    Move {
        dragged_id: String,
        target_id: String,
    },
    /// List tasks
    ///
    /// Example: taskboard list
    /// Example: taskboard list pending
    List {
        #[command(subcommand)]
        list: Option<ListCommand>,
    },
    /// Show the productivity score
    ///
    /// Example: taskboard score
    Score,
    /// Re-check the weekly score reset
    ///
    /// Example: taskboard tick
    Tick,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListCommand {
    /// Pending tasks in your order, then completed tasks
    All,
    /// Pending tasks in your order
    Pending,
    /// Completed tasks in the order they were added
    Completed,
}

/// One `--config-override KEY=VALUE` item, already validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOverride {
    Theme(Theme),
    DecayDays(u32),
}

/// Keys are case-insensitive and accept `-` in place of `_`.
pub fn parse_config_override(raw: &str) -> Result<ConfigOverride, AppError> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| AppError::validation("override must be in KEY=VALUE format"))?;
    let key = key.trim().to_ascii_lowercase().replace('-', "_");
    let value = value.trim();

    match key.as_str() {
        "" => Err(AppError::validation("override key cannot be empty")),
        "theme" => value.parse().map(ConfigOverride::Theme),
        "decay_days" | "decay" => match value.parse::<u32>() {
            Ok(days) if days > 0 => Ok(ConfigOverride::DecayDays(days)),
            _ => Err(AppError::validation("decay_days must be a positive whole number")),
        },
        other => Err(AppError::validation(format!("unknown config field '{other}'"))),
    }
}
