use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use super::framed::{run_session, FrameHandler};
use super::{BoxedIo, ConnectFilter, ConnectHandler, RequestHead, Side, TunnelError, TunnelIo};
use crate::frame::DEFAULT_MAX_FRAME_SIZE;
use crate::settings::TunnelSettings;

/// 들어온 CONNECT 소켓을 프레임 세션으로 받아 처리합니다.
///
/// 응답 줄은 보내지 않습니다. 첫 바이트부터 프레임입니다.
#[derive(Clone)]
pub struct ConnectServant {
    filter: ConnectFilter,
    handler: Arc<dyn FrameHandler>,
    max_frame_size: usize,
}

impl ConnectServant {
    pub fn new<H: FrameHandler + 'static>(handler: H) -> Self {
        Self::shared(Arc::new(handler))
    }

    pub fn shared(handler: Arc<dyn FrameHandler>) -> Self {
        Self {
            filter: Arc::new(|_| true),
            handler,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// `[tunnel]` 설정의 최대 프레임 크기를 적용합니다.
    pub fn from_settings<H: FrameHandler + 'static>(handler: H, settings: &TunnelSettings) -> Self {
        Self::new(handler).max_frame_size(settings.max_frame_size)
    }

    pub fn filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestHead) -> bool + Send + Sync + 'static,
    {
        self.filter = Arc::new(f);
        self
    }

    pub fn max_frame_size(mut self, max: usize) -> Self {
        self.max_frame_size = max;
        self
    }

    pub async fn serve<S>(&self, req: &RequestHead, socket: S, head: Bytes) -> Result<(), TunnelError>
    where
        S: TunnelIo,
    {
        if !(self.filter)(req) {
            debug!(target = %req.target, "필터에 의해 CONNECT 거부");
            return Ok(());
        }
        debug!(target = %req.target, "프레임 세션 시작");
        run_session(socket, head, req, self.handler.as_ref(), Side::Client, self.max_frame_size).await
    }
}

#[async_trait]
impl ConnectHandler for ConnectServant {
    async fn handle(&self, req: RequestHead, socket: BoxedIo, head: Bytes) -> Result<(), TunnelError> {
        let result = self.serve(&req, socket, head).await;
        if let Err(e) = &result {
            self.handler.on_error(e, &req);
        }
        result
    }
}
