//! CONNECT 터널: 직접 TCP 중계와 길이 접두 프레임 세션

mod client;
mod connect;
mod error;
mod framed;
mod head;
mod relay;
mod servant;
mod target;

pub use client::ConnectClient;
pub use connect::{ConnectTunnel, TunnelErrorHook};
pub use error::TunnelError;
pub use framed::{FrameHandler, FrameWriter};
pub use head::{read_head, RequestHead, MAX_HEAD_SIZE};
pub use relay::relay;
pub use servant::ConnectServant;
pub use target::{parse_host_port, ConnectTarget};

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncWrite};

/// 터널에 넘길 수 있는 양방향 소켓
pub trait TunnelIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TunnelIo for T {}

pub type BoxedIo = Box<dyn TunnelIo>;

pub type ConnectFilter = Arc<dyn Fn(&RequestHead) -> bool + Send + Sync>;

/// 서버가 CONNECT 요청을 받으면 소켓 소유권을 넘겨받는 처리기
///
/// `head`는 요청 헤더 뒤에 이미 읽힌 바이트입니다. 반환되면 소켓은 닫힙니다.
#[async_trait]
pub trait ConnectHandler: Send + Sync {
    async fn handle(&self, req: RequestHead, socket: BoxedIo, head: Bytes) -> Result<(), TunnelError>;
}

/// 중계 오류가 난 쪽
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Client,
    Target,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => write!(f, "client"),
            Side::Target => write!(f, "target"),
        }
    }
}

/// 직접 터널의 진행 단계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TunnelState {
    /// 요청 헤더를 받고 필터를 통과하기 전
    Awaiting,
    Connecting,
    Relaying,
    Closed,
}

impl fmt::Display for TunnelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TunnelState::Awaiting => write!(f, "awaiting"),
            TunnelState::Connecting => write!(f, "connecting"),
            TunnelState::Relaying => write!(f, "relaying"),
            TunnelState::Closed => write!(f, "closed"),
        }
    }
}
