use std::collections::HashMap;

use hyper::header::HeaderMap;
use hyper::Request;

use super::pattern::{Capture, FieldMatch, Pattern};
use crate::middleware::Context;

/// 요청 method, url, 헤더에 대한 선언적 매칭 규칙
///
/// 지정하지 않은 필드는 항상 통과합니다. 모든 필드가 일치할 때만 캡처가 반영됩니다.
#[derive(Debug, Clone, Default)]
pub struct Selector {
    method: Pattern,
    url: Pattern,
    headers: Option<Vec<(String, Pattern)>>,
}

/// 매칭에 성공한 셀렉터가 만들어 낸 캡처
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Captures {
    pub method: Option<Capture>,
    pub url: Option<Capture>,
    pub headers: Option<HashMap<String, Capture>>,
}

impl Captures {
    /// 컨텍스트에 캡처를 기록합니다. 헤더 캡처는 기존 맵을 대체합니다.
    pub fn apply(self, ctx: &mut Context) {
        if let Some(method) = self.method {
            ctx.method = Some(method);
        }
        if let Some(url) = self.url {
            ctx.url = Some(url);
        }
        if let Some(headers) = self.headers {
            ctx.headers = headers;
        }
    }
}

impl Selector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, pattern: impl Into<Pattern>) -> Self {
        self.method = pattern.into();
        self
    }

    pub fn url(mut self, pattern: impl Into<Pattern>) -> Self {
        self.url = pattern.into();
        self
    }

    /// 헤더 이름은 소문자로 비교합니다.
    pub fn header(mut self, name: &str, pattern: impl Into<Pattern>) -> Self {
        self.headers
            .get_or_insert_with(Vec::new)
            .push((name.to_ascii_lowercase(), pattern.into()));
        self
    }

    pub fn matches(&self, method: &str, url: &str, headers: &HeaderMap) -> Option<Captures> {
        let mut captures = Captures::default();

        match self.method.evaluate(Some(method), false) {
            FieldMatch::Failed => return None,
            FieldMatch::Matched(capture) => captures.method = Some(capture),
            FieldMatch::Skipped => {}
        }

        match self.url.evaluate(Some(url), true) {
            FieldMatch::Failed => return None,
            FieldMatch::Matched(capture) => captures.url = Some(capture),
            FieldMatch::Skipped => {}
        }

        if let Some(patterns) = &self.headers {
            let mut matched = HashMap::new();
            for (name, pattern) in patterns {
                let value = header_value(headers, name);
                match pattern.evaluate(value.as_deref(), false) {
                    FieldMatch::Failed => return None,
                    FieldMatch::Matched(capture) => {
                        matched.insert(name.clone(), capture);
                    }
                    FieldMatch::Skipped => {}
                }
            }
            captures.headers = Some(matched);
        }

        Some(captures)
    }

    /// url은 수신한 요청 대상 문자열 그대로 비교합니다.
    pub fn matches_request<B>(&self, req: &Request<B>) -> Option<Captures> {
        let url = req.uri().to_string();
        self.matches(req.method().as_str(), &url, req.headers())
    }
}

impl From<Pattern> for Selector {
    fn from(pattern: Pattern) -> Self {
        Selector::new().url(pattern)
    }
}

impl From<&str> for Selector {
    fn from(url: &str) -> Self {
        Selector::new().url(url)
    }
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    (!values.is_empty()).then(|| values.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let captures = Selector::new().matches("DELETE", "/x", &HeaderMap::new()).unwrap();
        assert_eq!(captures, Captures::default());
    }

    #[test]
    fn test_all_fields_must_match() {
        let selector = Selector::new()
            .method("POST")
            .url("/api")
            .header("Content-Type", Pattern::regex("json").unwrap());

        let ok = headers(&[("content-type", "application/json")]);
        let captures = selector.matches("POST", "/api/users", &ok).unwrap();
        assert_eq!(captures.url, Some(Capture::Text("/users".into())));
        assert!(captures.headers.unwrap().contains_key("content-type"));

        assert!(selector.matches("GET", "/api/users", &ok).is_none());
        assert!(selector.matches("POST", "/api/users", &HeaderMap::new()).is_none());
    }

    #[test]
    fn test_header_values_are_joined() {
        let selector = Selector::new().header("accept", "a, b");
        assert!(selector.matches("GET", "/", &headers(&[("accept", "a"), ("accept", "b")])).is_some());
    }
}
