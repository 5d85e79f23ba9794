use crate::error::AppError;
use crate::score::DEFAULT_DECAY_DAYS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "TASKBOARD_CONFIG_PATH";

/// Colour scheme for terminal output. `plain` prints no escape codes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Plain,
    Noir,
    Solarized,
}

impl Theme {
    pub fn palette(self) -> Palette {
        match self {
            Theme::Plain => Palette::default(),
            Theme::Noir => Palette {
                accent: Some("38;5;208"),
                muted: Some("38;5;250"),
            },
            Theme::Solarized => Palette {
                accent: Some("38;5;108"),
                muted: Some("38;5;246"),
            },
        }
    }
}

impl FromStr for Theme {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(Theme::Plain),
            "noir" => Ok(Theme::Noir),
            "solarized" => Ok(Theme::Solarized),
            other => Err(AppError::validation(format!(
                "unknown theme '{other}' (expected plain, noir or solarized)"
            ))),
        }
    }
}

/// SGR colour codes applied around headings and secondary text.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    accent: Option<&'static str>,
    muted: Option<&'static str>,
}

impl Palette {
    pub fn accent(&self, text: &str) -> String {
        paint(self.accent, text)
    }

    pub fn muted(&self, text: &str) -> String {
        paint(self.muted, text)
    }
}

fn paint(code: Option<&str>, text: &str) -> String {
    match code {
        Some(code) => format!("\x1b[{code}m{text}\x1b[0m"),
        None => text.to_string(),
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub theme: Theme,
    /// Days without a reset before the productivity score drops to zero.
    #[serde(default)]
    pub decay_days: Option<u32>,
}

impl Config {
    pub fn decay_days(&self) -> u32 {
        self.decay_days.unwrap_or(DEFAULT_DECAY_DAYS)
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub theme: Option<Theme>,
    pub decay_days: Option<u32>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("taskboard").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home).join(".config").join("taskboard").join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: Config::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::persistence(format!("{}: {}", path.display(), err)))?;
    let config: Config = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    if config.decay_days == Some(0) {
        return Err(AppError::invalid_data(format!(
            "decay_days in {} must be at least 1",
            path.display()
        )));
    }
    Ok(config)
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(theme) = overrides.theme {
        merged.theme = theme;
    }

    if let Some(decay_days) = overrides.decay_days.filter(|days| *days > 0) {
        merged.decay_days = Some(decay_days);
    }

    merged
}
