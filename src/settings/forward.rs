use serde::Deserialize;
use super::env::{parse_env_var, parse_optional_env_var};
use super::SettingsError;

#[derive(Debug, Clone, Deserialize)]
pub struct ForwardSettings {
    /// 없으면 요청이 가리키는 곳으로 그대로 전달
    #[serde(default)]
    pub target: Option<String>,

    /// 응답 본문 전송 속도 (초당 바이트)
    #[serde(default)]
    pub bps: Option<u64>,

    /// bps를 모든 활성 연결이 나눠 씀
    #[serde(default)]
    pub global_bps: bool,

    #[serde(default = "default_force_header_host")]
    pub force_header_host: bool,
}

fn default_force_header_host() -> bool { true }

impl ForwardSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            target: parse_optional_env_var("PROXY_FORWARD_TARGET")?,
            bps: parse_optional_env_var("PROXY_FORWARD_BPS")?,
            global_bps: parse_env_var("PROXY_FORWARD_GLOBAL_BPS", || false)?,
            force_header_host: parse_env_var("PROXY_FORCE_HEADER_HOST", default_force_header_host)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.bps == Some(0) {
            return Err(SettingsError::invalid("forward.bps", "0보다 커야 합니다"));
        }
        if self.global_bps && self.bps.is_none() {
            return Err(SettingsError::invalid("forward.global_bps", "forward.bps 없이 쓸 수 없습니다"));
        }
        Ok(())
    }
}

impl Default for ForwardSettings {
    fn default() -> Self {
        Self {
            target: None,
            bps: None,
            global_bps: false,
            force_header_host: default_force_header_host(),
        }
    }
}
