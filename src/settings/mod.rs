use std::path::Path;
use serde::Deserialize;
use tracing::debug;

mod env;
mod error;
mod forward;
mod helper;
pub mod logging;
mod server;
mod tunnel;

pub use error::SettingsError;
pub use forward::ForwardSettings;
pub use helper::{HelperSettings, WatchEntry};
pub use logging::LogSettings;
pub use env::{parse_env_var, parse_optional_env_var};
pub use server::ServerSettings;
pub use tunnel::{TunnelMode, TunnelSettings};

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    // 서버 설정
    #[serde(default)]
    pub server: ServerSettings,

    // 로깅 설정
    #[serde(default)]
    pub logging: LogSettings,

    /// CONNECT 터널 설정
    #[serde(default)]
    pub tunnel: TunnelSettings,

    /// 업스트림 포워딩 설정
    #[serde(default)]
    pub forward: ForwardSettings,

    /// 보조 엔드포인트/정적 파일 설정
    #[serde(default)]
    pub helper: HelperSettings,
}

impl Settings {
    pub async fn load() -> Result<Self> {
        if let Ok(config_path) = std::env::var("PROXY_CONFIG_FILE") {
            Self::from_toml_file(&config_path).await
        } else {
            Self::from_env().await
        }
    }

    pub async fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("설정 파일 로드: {}", path.as_ref().display());
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| SettingsError::FileError {
            path: path.as_ref().to_string_lossy().to_string(),
            error: e,
        })?;

        let settings = Self::from_toml_str(&content)?;
        settings.validate().await?;
        Ok(settings)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| SettingsError::ParseError { source: e })
    }

    pub async fn from_env() -> Result<Self> {
        let settings = Self {
            server: ServerSettings::from_env()?,
            logging: LogSettings::from_env()?,
            tunnel: TunnelSettings::from_env()?,
            forward: ForwardSettings::from_env()?,
            helper: HelperSettings::from_env()?,
        };

        // 설정 생성 시점에 바로 검증
        settings.validate().await?;
        Ok(settings)
    }

    /// 설정 유효성 검증
    pub async fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.tunnel.validate()?;
        self.forward.validate()?;
        self.helper.validate()?;

        if let Some(root) = &self.helper.static_root {
            let exists = tokio::fs::try_exists(root).await.unwrap_or(false);
            if !exists {
                return Err(SettingsError::invalid("helper.static_root", format!("디렉토리가 없습니다: {}", root)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_toml() {
        let toml_content = r#"
            [server]
            http_port = 9000

            [logging]
            format = "json"
            level = "debug"

            [tunnel]
            mode = "disabled"
            host = "127.0.0.1:7000"

            [forward]
            target = "backend.local"
            bps = 2048
            global_bps = true

            [[helper.watch]]
            path = "dist/app.js"
            url = "/app.js"
        "#;

        let settings = Settings::from_toml_str(toml_content).unwrap();
        assert_eq!(settings.server.http_port, 9000);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.logging.format, logging::LogFormat::Json);
        assert_eq!(settings.tunnel.mode, TunnelMode::Disabled);
        assert_eq!(settings.forward.bps, Some(2048));
        assert!(settings.forward.force_header_host);
        assert_eq!(settings.helper.watch.len(), 1);
        assert_eq!(settings.helper.sse_prefix, "/proxy-sse");
    }

    #[test]
    fn test_invalid_log_level_in_toml() {
        let result = Settings::from_toml_str("[logging]\nlevel = \"loud\"\n");
        assert!(matches!(result, Err(SettingsError::ParseError { .. })));
    }

    #[test]
    fn test_global_bps_requires_bps() {
        let settings = ForwardSettings { global_bps: true, ..ForwardSettings::default() };
        assert!(settings.validate().is_err());
    }
}
