use serde::Deserialize;

use super::env::parse_env_var;
use super::SettingsError;

/// 프록시가 듣는 주소
#[derive(Clone, Debug, Deserialize)]
pub struct ServerSettings {
    /// 바인딩 주소 (기본값: 0.0.0.0)
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP 포트 (기본값: 8123). 0이면 운영체제가 빈 포트를 고릅니다.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_http_port() -> u16 { 8123 }

impl ServerSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            host: parse_env_var("PROXY_HOST", default_host)?,
            http_port: parse_env_var("PROXY_HTTP_PORT", default_http_port)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.host.trim().is_empty() {
            return Err(SettingsError::invalid("server.host", "비어 있습니다"));
        }
        if self.host.contains(':') && !self.host.starts_with('[') {
            return Err(SettingsError::invalid("server.host", "포트는 http_port로 지정합니다"));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}
