use serde::Deserialize;
use std::env;
use std::net::SocketAddr;
use super::SettingsError;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ServerSettings {
    /// HTTP 포트 (기본값: 8080)
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// 요청을 전달할 업스트림 주소 (기본값: 127.0.0.1:8081)
    #[serde(default = "default_upstream")]
    pub upstream: SocketAddr,
}

fn default_http_port() -> u16 { 8080 }

fn default_upstream() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8081))
}

pub fn parse_env_var<T, F>(name: &str, default: F) -> Result<T, SettingsError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: FnOnce() -> T,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: val,
            reason: e.to_string(),
        }),
        Err(env::VarError::NotPresent) => Ok(default()),
        Err(e) => Err(SettingsError::EnvVarInvalid {
            var_name: name.to_string(),
            value: "".to_string(),
            reason: e.to_string(),
        }),
    }
}

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            http_port: parse_env_var("REWRITE_HTTP_PORT", default_http_port)?,
            upstream: parse_env_var("REWRITE_UPSTREAM", default_upstream)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.http_port == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "REWRITE_HTTP_PORT".to_string(),
                value: self.http_port.to_string(),
                reason: "포트는 0이 될 수 없습니다".to_string(),
            });
        }

        if self.upstream.port() == 0 {
            return Err(SettingsError::EnvVarInvalid {
                var_name: "REWRITE_UPSTREAM".to_string(),
                value: self.upstream.to_string(),
                reason: "업스트림 포트는 0이 될 수 없습니다".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            upstream: default_upstream(),
        }
    }
}
