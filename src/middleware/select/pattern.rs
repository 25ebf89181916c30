use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use regex_lite::Regex;

/// 셀렉터가 필드에서 뽑아낸 값
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    /// 문자열 매치 결과 (url 리터럴이면 접두사 뒤 나머지)
    Text(String),
    /// 정규식 그룹. 0번은 전체 매치
    Groups(Vec<Option<String>>),
    /// 경로 패턴의 이름 있는 파라미터
    Params(HashMap<String, String>),
}

impl Capture {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Capture::Text(text) => Some(text),
            Capture::Groups(groups) => groups.first().and_then(|g| g.as_deref()),
            Capture::Params(_) => None,
        }
    }

    pub fn group(&self, index: usize) -> Option<&str> {
        match self {
            Capture::Groups(groups) => groups.get(index).and_then(|g| g.as_deref()),
            _ => None,
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        match self {
            Capture::Params(params) => params.get(name).map(String::as_str),
            _ => None,
        }
    }
}

impl From<&str> for Capture {
    fn from(text: &str) -> Self {
        Capture::Text(text.to_string())
    }
}

impl From<String> for Capture {
    fn from(text: String) -> Self {
        Capture::Text(text)
    }
}

pub type Predicate = Arc<dyn Fn(&str) -> Option<Capture> + Send + Sync>;

/// 필드 하나에 대한 매칭 규칙
#[derive(Clone, Default)]
pub enum Pattern {
    /// 항상 통과하며 아무것도 캡처하지 않음
    #[default]
    Absent,
    Literal(String),
    Regex(Regex),
    Predicate(Predicate),
}

/// 필드 하나를 평가한 결과
#[derive(Debug, PartialEq)]
pub(crate) enum FieldMatch {
    Skipped,
    Matched(Capture),
    Failed,
}

impl Pattern {
    pub fn literal(text: impl Into<String>) -> Self {
        Pattern::Literal(text.into())
    }

    pub fn regex(source: &str) -> Result<Self, regex_lite::Error> {
        Regex::new(source).map(Pattern::Regex)
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> Option<Capture> + Send + Sync + 'static,
    {
        Pattern::Predicate(Arc::new(f))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Pattern::Absent)
    }

    /// `prefix`가 참이면 리터럴을 접두사로 보고 나머지를 캡처합니다.
    pub(crate) fn evaluate(&self, value: Option<&str>, prefix: bool) -> FieldMatch {
        if self.is_absent() {
            return FieldMatch::Skipped;
        }
        let Some(value) = value else {
            return FieldMatch::Failed;
        };

        let captured = match self {
            Pattern::Absent => None,
            Pattern::Literal(text) if prefix => value.strip_prefix(text.as_str()).map(|rest| {
                if rest.is_empty() {
                    Capture::Text("/".to_string())
                } else {
                    Capture::Text(rest.to_string())
                }
            }),
            Pattern::Literal(text) => (value == text).then(|| Capture::Text(value.to_string())),
            Pattern::Regex(regex) => regex.captures(value).map(|caps| {
                Capture::Groups(
                    caps.iter()
                        .map(|m| m.map(|m| m.as_str().to_string()))
                        .collect(),
                )
            }),
            Pattern::Predicate(f) => f(value),
        };

        match captured {
            Some(capture) => FieldMatch::Matched(capture),
            None => FieldMatch::Failed,
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Absent => write!(f, "Absent"),
            Pattern::Literal(text) => f.debug_tuple("Literal").field(text).finish(),
            Pattern::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            Pattern::Predicate(_) => write!(f, "Predicate(..)"),
        }
    }
}

impl From<&str> for Pattern {
    fn from(text: &str) -> Self {
        Pattern::Literal(text.to_string())
    }
}

impl From<String> for Pattern {
    fn from(text: String) -> Self {
        Pattern::Literal(text)
    }
}

impl From<Regex> for Pattern {
    fn from(regex: Regex) -> Self {
        Pattern::Regex(regex)
    }
}
