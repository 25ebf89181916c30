use std::fmt;

#[derive(Debug)]
pub enum ForwardError {
    /// 상대 경로 대상인데 Host 헤더가 없음
    MissingHost,
    InvalidTarget {
        target: String,
        reason: String,
    },
    Upstream(hyper_util::client::legacy::Error),
    /// 업스트림 응답 본문 수집 실패
    Body(String),
}

impl fmt::Display for ForwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForwardError::MissingHost =>
                write!(f, "Host 헤더가 없어 대상 주소를 만들 수 없습니다"),
            ForwardError::InvalidTarget { target, reason } =>
                write!(f, "잘못된 대상 주소 {}: {}", target, reason),
            ForwardError::Upstream(e) => write!(f, "업스트림 요청 실패: {}", e),
            ForwardError::Body(e) => write!(f, "업스트림 응답 본문 읽기 실패: {}", e),
        }
    }
}

impl std::error::Error for ForwardError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ForwardError::Upstream(e) => Some(e),
            _ => None,
        }
    }
}
