use std::fmt;

#[derive(Debug)]
pub enum SettingsError {
    EnvVarInvalid {
        var_name: String,
        value: String,
        reason: String,
    },
    FileError {
        path: String,
        error: std::io::Error,
    },
    ParseError {
        source: toml::de::Error,
    },
    /// 값은 읽었지만 허용 범위를 벗어남
    InvalidValue {
        key: String,
        reason: String,
    },
    /// 로그 출력 대상을 열거나 구독자를 설치하지 못함
    Logging(String),
}

impl SettingsError {
    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnvVarInvalid { var_name, value, reason } =>
                write!(f, "환경 변수 {}={:?} 해석 실패: {}", var_name, value, reason),
            Self::FileError { path, error } =>
                write!(f, "설정 파일 {}을(를) 읽을 수 없습니다: {}", path, error),
            Self::ParseError { source } =>
                write!(f, "TOML 설정 해석 실패: {}", source),
            Self::InvalidValue { key, reason } =>
                write!(f, "설정 {} 값이 잘못되었습니다: {}", key, reason),
            Self::Logging(msg) =>
                write!(f, "로깅 설정 실패: {}", msg),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ParseError { source } => Some(source),
            Self::FileError { error, .. } => Some(error),
            _ => None,
        }
    }
}
