use std::borrow::Cow;

use hyper::Uri;
use url::Url;

use super::ForwardError;

/// 포워딩 대상
#[derive(Debug, Clone)]
pub enum Target {
    /// 호스트, 상대 경로 또는 전체 URL 문자열
    Literal(String),
    /// 이미 파싱된 URL (그대로 사용)
    Url(Url),
}

impl From<&str> for Target {
    fn from(target: &str) -> Self {
        Target::Literal(target.to_string())
    }
}

impl From<String> for Target {
    fn from(target: String) -> Self {
        Target::Literal(target)
    }
}

impl From<Url> for Target {
    fn from(url: Url) -> Self {
        Target::Url(url)
    }
}

/// 업스트림 URL을 결정합니다.
///
/// - 대상이 없으면 수신한 요청 대상 문자열을 사용
/// - `/`로 시작하면 요청 Host 헤더 뒤에 붙임
/// - `/`가 없으면 호스트로 보고 원래 요청 경로를 붙임
/// - 그 외에는 URL로 보고, 스킴이 없으면 `http://`를 붙임
pub fn resolve_target(
    target: Option<&Target>,
    request_uri: &Uri,
    request_host: Option<&str>,
) -> Result<Uri, ForwardError> {
    let literal: Cow<'_, str> = match target {
        Some(Target::Url(url)) => return parse_uri(url.as_str()),
        Some(Target::Literal(text)) => Cow::Borrowed(text.as_str()),
        None => Cow::Owned(request_uri.to_string()),
    };

    let resolved = match literal.find('/') {
        Some(0) => {
            let host = request_host.ok_or(ForwardError::MissingHost)?;
            format!("http://{}{}", host, literal)
        }
        None => {
            let path = request_uri.path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            format!("http://{}{}", literal, path)
        }
        Some(_) if literal.contains("://") => literal.into_owned(),
        Some(_) => format!("http://{}", literal),
    };

    let url = Url::parse(&resolved).map_err(|e| ForwardError::InvalidTarget {
        target: resolved.clone(),
        reason: e.to_string(),
    })?;
    parse_uri(url.as_str())
}

fn parse_uri(text: &str) -> Result<Uri, ForwardError> {
    text.parse::<Uri>().map_err(|e| ForwardError::InvalidTarget {
        target: text.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(s: &str) -> Uri {
        s.parse().unwrap()
    }

    #[test]
    fn test_host_only_keeps_request_path() {
        let target = Target::from("other.com");
        let resolved = resolve_target(Some(&target), &uri("/a/b?q=1"), Some("origin.com")).unwrap();
        assert_eq!(resolved.to_string(), "http://other.com/a/b?q=1");
    }

    #[test]
    fn test_relative_path_uses_host_header() {
        let target = Target::from("/x");
        let resolved = resolve_target(Some(&target), &uri("/ignored"), Some("h")).unwrap();
        assert_eq!(resolved.to_string(), "http://h/x");
    }

    #[test]
    fn test_relative_path_without_host_fails() {
        let target = Target::from("/x");
        assert!(matches!(
            resolve_target(Some(&target), &uri("/"), None),
            Err(ForwardError::MissingHost)
        ));
    }

    #[test]
    fn test_url_without_scheme() {
        let target = Target::from("cdn.com/s.js");
        let resolved = resolve_target(Some(&target), &uri("/"), None).unwrap();
        assert_eq!(resolved.to_string(), "http://cdn.com/s.js");
    }

    #[test]
    fn test_transparent_absolute_form() {
        let resolved = resolve_target(None, &uri("http://site.com:8080/p"), Some("site.com:8080")).unwrap();
        assert_eq!(resolved.to_string(), "http://site.com:8080/p");
    }

    #[test]
    fn test_transparent_origin_form() {
        let resolved = resolve_target(None, &uri("/p?x"), Some("site.com")).unwrap();
        assert_eq!(resolved.to_string(), "http://site.com/p?x");
    }
}
