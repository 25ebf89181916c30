//! 환경 변수 해석 도우미

use std::env;
use std::str::FromStr;

use super::SettingsError;

fn invalid(name: &str, value: String, reason: impl ToString) -> SettingsError {
    SettingsError::EnvVarInvalid {
        var_name: name.to_string(),
        value,
        reason: reason.to_string(),
    }
}

/// 설정된 값을 읽습니다. 비어 있거나 없으면 None
fn read(name: &str) -> Result<Option<String>, SettingsError> {
    match env::var(name) {
        Ok(val) if val.trim().is_empty() => Ok(None),
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(invalid(name, String::new(), e)),
    }
}

/// 값이 없으면 `default()`를 씁니다.
pub fn parse_env_var<T, F>(name: &str, default: F) -> Result<T, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: FnOnce() -> T,
{
    Ok(parse_optional_env_var(name)?.unwrap_or_else(default))
}

pub fn parse_optional_env_var<T>(name: &str) -> Result<Option<T>, SettingsError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match read(name)? {
        Some(val) => val.trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| invalid(name, val.clone(), e)),
        None => Ok(None),
    }
}
