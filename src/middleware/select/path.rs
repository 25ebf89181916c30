use std::collections::HashMap;
use std::fmt;

use regex_lite::Regex;

use super::pattern::{Capture, Pattern};

/// `/users/:id/:tab?` 형태의 경로 패턴
///
/// 쿼리 문자열은 비교 전에 제거하고 끝의 `/` 하나는 허용합니다.
#[derive(Debug, Clone)]
pub struct PathPattern {
    source: String,
    regex: Regex,
    keys: Vec<String>,
}

#[derive(Debug, PartialEq)]
pub enum PathPatternError {
    InvalidParam(String),
    Regex(String),
}

impl fmt::Display for PathPatternError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathPatternError::InvalidParam(seg) => write!(f, "잘못된 경로 파라미터: {}", seg),
            PathPatternError::Regex(msg) => write!(f, "경로 패턴 컴파일 실패: {}", msg),
        }
    }
}

impl std::error::Error for PathPatternError {}

impl PathPattern {
    pub fn compile(pattern: &str) -> Result<Self, PathPatternError> {
        let mut source = String::from("^");
        let mut keys = Vec::new();

        for segment in pattern.split('/').filter(|s| !s.is_empty()) {
            match segment.strip_prefix(':') {
                Some(param) => {
                    let (name, optional) = match param.strip_suffix('?') {
                        Some(name) => (name, true),
                        None => (param, false),
                    };
                    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                        return Err(PathPatternError::InvalidParam(segment.to_string()));
                    }
                    keys.push(name.to_string());
                    source.push_str(if optional { "(?:/([^/]+?))?" } else { "/([^/]+?)" });
                }
                None => {
                    source.push('/');
                    source.push_str(&regex_lite::escape(segment));
                }
            }
        }
        source.push_str("/?$");

        let regex = Regex::new(&source).map_err(|e| PathPatternError::Regex(e.to_string()))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
            keys,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// 일치하면 파라미터 맵을 돌려줍니다. 값이 없는 선택 파라미터는 빠집니다.
    pub fn matches(&self, url: &str) -> Option<HashMap<String, String>> {
        let path = url.split('?').next().unwrap_or(url);
        let caps = self.regex.captures(path)?;

        let params = self.keys.iter()
            .enumerate()
            .filter_map(|(i, key)| {
                caps.get(i + 1).map(|m| (key.clone(), m.as_str().to_string()))
            })
            .collect();
        Some(params)
    }
}

impl From<PathPattern> for Pattern {
    fn from(path: PathPattern) -> Self {
        Pattern::predicate(move |url| path.matches(url).map(Capture::Params))
    }
}
