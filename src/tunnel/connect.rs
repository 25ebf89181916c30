use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::target::{parse_host_port, ConnectTarget};
use super::{relay, BoxedIo, ConnectFilter, ConnectHandler, RequestHead, Side, TunnelError, TunnelIo, TunnelState};
use crate::settings::TunnelSettings;

pub type TunnelErrorHook = Arc<dyn Fn(&TunnelError, &RequestHead) + Send + Sync>;

/// CONNECT 요청을 TCP 대상과 바이트 단위로 이어 주는 직접 터널
#[derive(Clone)]
pub struct ConnectTunnel {
    filter: ConnectFilter,
    host: Option<String>,
    port: Option<u16>,
    connect_timeout: Option<Duration>,
    on_error: TunnelErrorHook,
}

impl ConnectTunnel {
    pub fn new() -> Self {
        Self {
            filter: Arc::new(|_| true),
            host: None,
            port: None,
            connect_timeout: None,
            on_error: Arc::new(|err, req| {
                warn!(error = %err, side = ?err.side(), target = %req.target, "터널 오류");
            }),
        }
    }

    pub fn from_settings(settings: &TunnelSettings) -> Self {
        let mut tunnel = Self::new()
            .connect_timeout(Duration::from_secs(settings.connect_timeout_secs));
        if let Some(host) = &settings.host {
            tunnel = tunnel.host(host);
        }
        if let Some(port) = settings.port {
            tunnel = tunnel.port(port);
        }
        tunnel
    }

    /// 거짓을 반환한 요청은 아무 응답 없이 닫습니다.
    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestHead) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(f);
        self
    }

    /// 대상 호스트를 고정합니다. `host:port` 형식이면 포트도 함께 고정합니다.
    pub fn host(mut self, host: &str) -> Self {
        match parse_host_port(host) {
            Some((name, Some(port))) => {
                self.host = Some(name);
                self.port = Some(port);
            }
            _ => self.host = Some(host.to_string()),
        }
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = (!limit.is_zero()).then_some(limit);
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&TunnelError, &RequestHead) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(f);
        self
    }

    async fn dial(&self, target: &ConnectTarget) -> Result<TcpStream, TunnelError> {
        let connect = TcpStream::connect((target.host.as_str(), target.port));
        let result = match self.connect_timeout {
            Some(limit) => timeout(limit, connect).await.map_err(|_| TunnelError::DialTimeout {
                host: target.host.clone(),
                port: target.port,
                timeout: limit,
            })?,
            None => connect.await,
        };
        result.map_err(|source| TunnelError::Dial {
            host: target.host.clone(),
            port: target.port,
            source,
        })
    }

    /// 터널 하나를 끝까지 중계합니다.
    ///
    /// 프록시 형식이면 클라이언트에 200을 보내고, 아니면 원래 요청 헤더를 대상에 다시 씁니다.
    /// 헤더 뒤에 이미 도착한 바이트(`head`)는 대상에 먼저 보냅니다.
    pub async fn tunnel<S>(&self, req: &RequestHead, mut client: S, head: Bytes) -> Result<(), TunnelError>
    where
        S: TunnelIo,
    {
        debug!(state = %TunnelState::Awaiting, target = %req.target, "CONNECT 요청 수신");
        if !(self.filter)(req) {
            debug!(target = %req.target, "필터에 의해 CONNECT 거부");
            return Ok(());
        }

        let target = ConnectTarget::resolve(req, self.host.as_deref(), self.port)?;
        debug!(state = %TunnelState::Connecting, target = %target, "터널 대상 연결");
        let mut upstream = self.dial(&target).await?;

        if req.is_proxy_form() {
            let reply = format!("HTTP/{} 200 Connection established\r\n\r\n", req.version);
            client
                .write_all(reply.as_bytes())
                .await
                .map_err(|source| TunnelError::Relay { side: Side::Client, source })?;
        } else {
            upstream
                .write_all(&req.to_bytes())
                .await
                .map_err(|source| TunnelError::Relay { side: Side::Target, source })?;
        }
        if !head.is_empty() {
            upstream
                .write_all(&head)
                .await
                .map_err(|source| TunnelError::Relay { side: Side::Target, source })?;
        }

        debug!(state = %TunnelState::Relaying, target = %target, "터널 중계 시작");
        let (sent, received) = relay(client, upstream).await?;
        info!(state = %TunnelState::Closed, target = %target, sent, received, "터널 종료");
        Ok(())
    }
}

impl Default for ConnectTunnel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ConnectTunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectTunnel")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

#[async_trait]
impl ConnectHandler for ConnectTunnel {
    async fn handle(&self, req: RequestHead, socket: BoxedIo, head: Bytes) -> Result<(), TunnelError> {
        let result = self.tunnel(&req, socket, head).await;
        if let Err(e) = &result {
            (self.on_error)(e, &req);
        }
        result
    }
}
