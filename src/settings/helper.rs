use serde::Deserialize;
use super::env::{parse_env_var, parse_optional_env_var};
use super::SettingsError;

/// 파일 변경 시 SSE로 알릴 항목
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WatchEntry {
    pub path: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HelperSettings {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_sse_prefix")]
    pub sse_prefix: String,

    #[serde(default = "default_log_prefix")]
    pub log_prefix: String,

    /// 정적 파일 경로 접두사
    #[serde(default = "default_static_prefix")]
    pub static_prefix: String,

    /// 정적 파일 루트 (없으면 정적 파일 제공 안 함)
    #[serde(default)]
    pub static_root: Option<String>,

    #[serde(default)]
    pub watch: Vec<WatchEntry>,
}

fn default_sse_prefix() -> String { "/proxy-sse".to_string() }
fn default_log_prefix() -> String { "/proxy-log".to_string() }
fn default_static_prefix() -> String { "/static".to_string() }

impl HelperSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        let settings = Self {
            enabled: parse_env_var("PROXY_HELPER_ENABLED", || false)?,
            static_root: parse_optional_env_var("PROXY_STATIC_ROOT")?,
            ..Self::default()
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        for (name, prefix) in [
            ("helper.sse_prefix", &self.sse_prefix),
            ("helper.log_prefix", &self.log_prefix),
            ("helper.static_prefix", &self.static_prefix),
        ] {
            if !prefix.starts_with('/') {
                return Err(SettingsError::invalid(name, format!("'/'로 시작해야 합니다: {}", prefix)));
            }
        }
        Ok(())
    }
}

impl Default for HelperSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            sse_prefix: default_sse_prefix(),
            log_prefix: default_log_prefix(),
            static_prefix: default_static_prefix(),
            static_root: None,
            watch: Vec::new(),
        }
    }
}
