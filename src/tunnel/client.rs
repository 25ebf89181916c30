use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::framed::{run_session, FrameHandler};
use super::{RequestHead, Side, TunnelError};
use crate::frame::DEFAULT_MAX_FRAME_SIZE;

/// 원격 프록시에 CONNECT로 접속해 프레임 세션을 여는 클라이언트
#[derive(Clone)]
pub struct ConnectClient {
    host: String,
    port: u16,
    url: String,
    retry: Option<Duration>,
    max_frame_size: usize,
    handler: Arc<dyn FrameHandler>,
}

impl ConnectClient {
    pub fn new<H: FrameHandler + 'static>(handler: H) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 80,
            url: "/".to_string(),
            retry: None,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            handler: Arc::new(handler),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// CONNECT 요청 대상 문자열
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// 연결 오류가 나면 `delay` 뒤에 다시 접속합니다. 정상 종료 시에는 재접속하지 않습니다.
    pub fn retry(mut self, delay: Duration) -> Self {
        self.retry = Some(delay);
        self
    }

    pub fn max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    async fn connect_once(&self, origin: &RequestHead) -> Result<(), TunnelError> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port))
            .await
            .map_err(|source| TunnelError::Dial {
                host: self.host.clone(),
                port: self.port,
                source,
            })?;
        stream
            .write_all(&origin.to_bytes())
            .await
            .map_err(|source| TunnelError::Relay { side: Side::Target, source })?;

        info!(host = %self.host, port = self.port, url = %self.url, "프레임 세션 연결");
        run_session(stream, Bytes::new(), origin, self.handler.as_ref(), Side::Target, self.max_frame_size).await
    }

    pub async fn run(&self) -> Result<(), TunnelError> {
        let origin = RequestHead::connect(self.url.as_str());
        loop {
            match self.connect_once(&origin).await {
                Ok(()) => return Ok(()),
                Err(e) => match self.retry {
                    Some(delay) => {
                        warn!(error = %e, retry_in = ?delay, "프레임 세션 실패, 재접속 예정");
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        self.handler.on_error(&e, &origin);
                        return Err(e);
                    }
                },
            }
        }
    }

    pub fn spawn(self) -> JoinHandle<Result<(), TunnelError>> {
        tokio::spawn(async move { self.run().await })
    }
}
