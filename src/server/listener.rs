use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{debug, error, info};

use super::handler::RequestHandler;
use super::Result;
use crate::settings::ServerSettings;

pub struct ServerListener {
    http_listener: TcpListener,
}

impl ServerListener {
    pub async fn new(settings: &ServerSettings) -> Result<Self> {
        let addr = settings.bind_addr();
        let http_listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| {
                error!(error = %e, addr = %addr, "HTTP 포트 바인딩 실패");
                e
            })?;

        info!(addr = %addr, "HTTP 리스너 시작");
        Ok(Self { http_listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.http_listener.local_addr()?)
    }

    pub async fn run(self, handler: Arc<RequestHandler>) -> Result<()> {
        loop {
            match self.http_listener.accept().await {
                Ok((stream, peer)) => {
                    debug!(peer = %peer, "연결 수락");
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handler.handle_connection(stream).await {
                            error!(error = %err, peer = %peer, "연결 처리 실패");
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "HTTP 연결 수락 실패");
                }
            }
        }
    }
}
