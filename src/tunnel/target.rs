use super::{RequestHead, TunnelError};

/// 기본 포트
pub const DEFAULT_PORT: u16 = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
}

/// `host[:port]` 를 나눕니다. 포트 부분은 앞쪽 숫자만 읽습니다.
pub fn parse_host_port(text: &str) -> Option<(String, Option<u16>)> {
    let (host, rest) = match text.split_once(':') {
        Some((host, rest)) => (host, Some(rest)),
        None => (text, None),
    };
    if host.is_empty() {
        return None;
    }

    let port = rest.and_then(|rest| {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    });
    Some((host.to_string(), port))
}

impl ConnectTarget {
    /// 강제 설정 값 > 요청 값 > 기본 포트 순으로 대상을 정합니다.
    ///
    /// 프록시 형식이면 요청 대상을, 아니면 Host 헤더를 읽습니다.
    pub fn resolve(
        req: &RequestHead,
        forced_host: Option<&str>,
        forced_port: Option<u16>,
    ) -> Result<Self, TunnelError> {
        if let (Some(host), Some(port)) = (forced_host, forced_port) {
            return Ok(Self { host: host.to_string(), port });
        }

        let source = if req.is_proxy_form() {
            req.target.as_str()
        } else {
            req.header("host").ok_or(TunnelError::MissingHost)?
        };
        let (host, port) = parse_host_port(source)
            .ok_or_else(|| TunnelError::InvalidTarget(source.to_string()))?;

        Ok(Self {
            host: forced_host.map(str::to_string).unwrap_or(host),
            port: forced_port.or(port).unwrap_or(DEFAULT_PORT),
        })
    }
}

impl std::fmt::Display for ConnectTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
