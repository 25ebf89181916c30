use serde::Deserialize;
use super::env::{parse_env_var, parse_optional_env_var};
use super::SettingsError;
use crate::frame::DEFAULT_MAX_FRAME_SIZE;

/// CONNECT 요청 처리 방식
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TunnelMode {
    /// 대상 TCP 주소와 직접 중계
    #[default]
    Direct,
    /// CONNECT 연결을 바로 닫음
    Disabled,
}

impl std::str::FromStr for TunnelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "direct" => Ok(TunnelMode::Direct),
            "disabled" => Ok(TunnelMode::Disabled),
            _ => Err(format!("Invalid tunnel mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TunnelSettings {
    #[serde(default)]
    pub mode: TunnelMode,

    /// 모든 터널의 대상 호스트 고정 (`host:port` 가능)
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub port: Option<u16>,

    /// 프레임 세션의 최대 프레임 크기
    #[serde(default = "default_max_frame_size")]
    pub max_frame_size: usize,

    /// 대상 연결 제한 시간 (0이면 제한 없음)
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_max_frame_size() -> usize { DEFAULT_MAX_FRAME_SIZE }
fn default_connect_timeout() -> u64 { 10 }

impl TunnelSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            mode: parse_env_var("PROXY_TUNNEL_MODE", TunnelMode::default)?,
            host: parse_optional_env_var("PROXY_TUNNEL_HOST")?,
            port: parse_optional_env_var("PROXY_TUNNEL_PORT")?,
            max_frame_size: parse_env_var("PROXY_MAX_FRAME_SIZE", default_max_frame_size)?,
            connect_timeout_secs: parse_env_var("PROXY_CONNECT_TIMEOUT", default_connect_timeout)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.max_frame_size == 0 {
            return Err(SettingsError::invalid("tunnel.max_frame_size", "0보다 커야 합니다"));
        }
        if self.port == Some(0) {
            return Err(SettingsError::invalid("tunnel.port", "0이 될 수 없습니다"));
        }
        Ok(())
    }
}

impl Default for TunnelSettings {
    fn default() -> Self {
        Self {
            mode: TunnelMode::default(),
            host: None,
            port: None,
            max_frame_size: default_max_frame_size(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}
