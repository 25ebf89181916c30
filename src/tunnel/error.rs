use std::fmt;
use std::io;
use std::time::Duration;

use super::Side;
use crate::frame::FrameError;

#[derive(Debug)]
pub enum TunnelError {
    /// 대상 주소를 정할 Host 헤더가 없음
    MissingHost,
    InvalidTarget(String),
    Dial {
        host: String,
        port: u16,
        source: io::Error,
    },
    DialTimeout {
        host: String,
        port: u16,
        timeout: Duration,
    },
    /// 중계 중 한쪽 소켓에서 발생한 입출력 오류
    Relay {
        side: Side,
        source: io::Error,
    },
    /// 요청 헤더를 해석할 수 없음
    Handshake(String),
    HeadTooLarge {
        limit: usize,
    },
    Frame(FrameError),
    /// 세션이 이미 닫혀 프레임을 보낼 수 없음
    Closed,
    Io(io::Error),
}

impl TunnelError {
    /// 오류가 난 쪽 (중계 오류일 때만)
    pub fn side(&self) -> Option<Side> {
        match self {
            TunnelError::Relay { side, .. } => Some(*side),
            _ => None,
        }
    }
}

impl fmt::Display for TunnelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelError::MissingHost => write!(f, "Host 헤더가 없어 터널 대상을 정할 수 없습니다"),
            TunnelError::InvalidTarget(target) => write!(f, "잘못된 터널 대상: {}", target),
            TunnelError::Dial { host, port, source } =>
                write!(f, "{}:{} 연결 실패: {}", host, port, source),
            TunnelError::DialTimeout { host, port, timeout } =>
                write!(f, "{}:{} 연결 시간 초과 ({:?})", host, port, timeout),
            TunnelError::Relay { side, source } => write!(f, "{} 소켓 오류: {}", side, source),
            TunnelError::Handshake(msg) => write!(f, "잘못된 요청 헤더: {}", msg),
            TunnelError::HeadTooLarge { limit } => write!(f, "요청 헤더가 {}바이트를 넘습니다", limit),
            TunnelError::Frame(e) => write!(f, "프레임 오류: {}", e),
            TunnelError::Closed => write!(f, "터널 세션이 닫혔습니다"),
            TunnelError::Io(e) => write!(f, "IO 오류: {}", e),
        }
    }
}

impl std::error::Error for TunnelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TunnelError::Dial { source, .. } | TunnelError::Relay { source, .. } => Some(source),
            TunnelError::Frame(e) => Some(e),
            TunnelError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameError> for TunnelError {
    fn from(err: FrameError) -> Self {
        TunnelError::Frame(err)
    }
}

impl From<io::Error> for TunnelError {
    fn from(err: io::Error) -> Self {
        TunnelError::Io(err)
    }
}
