use serde::{Deserialize, Deserializer};
use std::env;
use tracing::Level;
use super::{server::parse_env_var, SettingsError};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum LogOutput {
    #[default]
    Stdout,
    File(String),
}

impl std::str::FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdout" => Ok(LogOutput::Stdout),
            _ => Ok(LogOutput::File(s.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for LogOutput {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        value.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub format: LogFormat,
    pub level: Level,
    pub output: LogOutput,
}

impl LogSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            format: parse_env_var("REWRITE_LOG_FORMAT", LogFormat::default)?,
            level: parse_log_level(
                env::var("REWRITE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            )?,
            output: parse_env_var("REWRITE_LOG_OUTPUT", LogOutput::default)?,
        })
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            level: Level::INFO,
            output: LogOutput::default(),
        }
    }
}

fn level_from_str(level: &str) -> Option<Level> {
    match level.to_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn parse_log_level(level: String) -> Result<Level, SettingsError> {
    level_from_str(&level).ok_or_else(|| SettingsError::EnvVarInvalid {
        var_name: "REWRITE_LOG_LEVEL".to_string(),
        value: level,
        reason: "유효하지 않은 로그 레벨".to_string(),
    })
}

impl<'de> Deserialize<'de> for LogSettings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Helper {
            #[serde(default)]
            format: LogFormat,
            #[serde(default = "default_log_level_string")]
            level: String,
            #[serde(default)]
            output: LogOutput,
        }

        let helper = Helper::deserialize(deserializer)?;
        Ok(LogSettings {
            format: helper.format,
            level: level_from_str(&helper.level).unwrap_or(Level::INFO),
            output: helper.output,
        })
    }
}

fn default_log_level_string() -> String {
    "info".to_string()
}
