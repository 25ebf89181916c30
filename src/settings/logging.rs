//! `[logging]` 설정: 출력 형식, 레벨, 출력 대상

use serde::{Deserialize, Deserializer};
use tracing::Level;

use super::env::parse_env_var;
use super::SettingsError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 사람이 읽는 한 줄 형식
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("text") {
            Ok(Self::Text)
        } else if s.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            Err(format!("text 또는 json 이어야 합니다: {}", s))
        }
    }
}

/// 로그 출력 대상. `stdout` 외의 값은 파일 경로로 봅니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum LogOutput {
    #[default]
    Stdout,
    File(String),
}

impl TryFrom<String> for LogOutput {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "" => Err("빈 로그 출력 경로".to_string()),
            v if v.eq_ignore_ascii_case("stdout") => Ok(Self::Stdout),
            v => Ok(Self::File(v.to_string())),
        }
    }
}

impl std::str::FromStr for LogOutput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

fn level_from_name<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let name = String::deserialize(deserializer)?;
    name.trim().parse().map_err(serde::de::Error::custom)
}

fn default_level() -> Level {
    Level::INFO
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogSettings {
    #[serde(default)]
    pub format: LogFormat,

    /// `error`, `warn`, `info`, `debug`, `trace` (대소문자 무시)
    #[serde(default = "default_level", deserialize_with = "level_from_name")]
    pub level: Level,

    #[serde(default)]
    pub output: LogOutput,
}

impl LogSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Ok(Self {
            format: parse_env_var("PROXY_LOG_FORMAT", LogFormat::default)?,
            level: parse_env_var("PROXY_LOG_LEVEL", default_level)?,
            output: parse_env_var("PROXY_LOG_OUTPUT", LogOutput::default)?,
        })
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: default_level(),
            output: LogOutput::Stdout,
        }
    }
}
