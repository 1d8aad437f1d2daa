//! 실행 파일 설정
//!
//! `REWRITE_CONFIG_FILE`이 가리키는 TOML 파일 또는 환경 변수에서 읽습니다.

use std::{env, fs, path::Path};
use serde::Deserialize;
use tracing::debug;
use crate::middleware::rewrite_body::{Config, RewriteChain};

mod error;
pub mod logging;
mod server;

pub use error::SettingsError;
pub use logging::{LogFormat, LogOutput, LogSettings};
pub use server::{parse_env_var, ServerSettings};

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    /// 응답 본문 재작성 설정
    #[serde(default)]
    pub rewrite: Config,
}

impl Settings {
    pub fn load() -> Result<Self> {
        if let Ok(config_path) = env::var("REWRITE_CONFIG_FILE") {
            Self::from_toml_file(&config_path)
        } else {
            Self::from_env()
        }
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings = Self::from_toml(&content)?;
        debug!(path = %path.as_ref().display(), "설정 파일 로드 완료");
        Ok(settings)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| SettingsError::ParseError { source: e })?;

        settings.validate()?;
        Ok(settings)
    }

    /// 환경 변수에서 설정을 읽습니다.
    ///
    /// 재작성 규칙은 `REWRITE_RULES_JSON`에 플러그인 설정 JSON으로 전달합니다.
    pub fn from_env() -> Result<Self> {
        let rewrite = match env::var("REWRITE_RULES_JSON") {
            Ok(json) => Config::from_json(&json).map_err(|e| SettingsError::EnvVarInvalid {
                var_name: "REWRITE_RULES_JSON".to_string(),
                value: json.clone(),
                reason: e.to_string(),
            })?,
            Err(_) => Config::default(),
        };

        let settings = Self {
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            rewrite,
        };

        settings.validate()?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    ///
    /// 재작성 정규식을 미리 컴파일해 잘못된 패턴이 있으면 시작 시점에 실패합니다.
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        RewriteChain::new(&self.rewrite.rewrites)
            .map_err(|source| SettingsError::InvalidRewrite { source })?;
        Ok(())
    }
}
