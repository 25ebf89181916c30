use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use hyper::body::{Body, Frame, Incoming, SizeHint};
use hyper::{Request, Response};
use hyper_util::client::legacy;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::middleware::throttle::{ConnectionGuard, ConnectionTracker};
use crate::middleware::{BoxBody, BoxError};

/// 업스트림 HTTP 클라이언트와 활성 연결 추적기
///
/// 복제본은 커넥션 풀과 추적기를 공유합니다.
#[derive(Clone)]
pub struct Agent {
    client: legacy::Client<HttpConnector, BoxBody>,
    tracker: ConnectionTracker,
}

impl Agent {
    pub fn new() -> Self {
        let connector = HttpConnector::new();
        let client = legacy::Client::builder(TokioExecutor::new())
            .build::<_, BoxBody>(connector);

        Self {
            client,
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// 요청을 보내고, 응답 본문이 끝날 때까지 유지되는 연결 가드를 함께 돌려줍니다.
    ///
    /// 가드는 요청을 보내기 전에 열리므로 응답을 기다리는 요청도 활성 연결로 셉니다.
    pub async fn request(
        &self,
        req: Request<BoxBody>,
    ) -> Result<(Response<Incoming>, ConnectionGuard), legacy::Error> {
        let guard = self.tracker.open();
        let response = self.client.request(req).await?;
        Ok((response, guard))
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("active", &self.tracker.active())
            .finish()
    }
}

/// 본문이 drop될 때 연결 가드를 해제하는 래퍼
pub struct TrackedBody {
    inner: BoxBody,
    _guard: ConnectionGuard,
}

impl TrackedBody {
    pub fn new(inner: BoxBody, guard: ConnectionGuard) -> Self {
        Self {
            inner,
            _guard: guard,
        }
    }
}

impl Body for TrackedBody {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::empty_body;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    async fn wait_for_active(tracker: &ConnectionTracker, expected: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while tracker.active() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_in_flight_request_is_counted() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await.unwrap();
            let _ = release_rx.await;
            stream
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\n\r\nok")
                .await
                .unwrap();
        });

        let agent = Agent::new();
        let req = Request::get(format!("http://{}/slow", addr))
            .body(empty_body())
            .unwrap();
        let pending = tokio::spawn({
            let agent = agent.clone();
            async move { agent.request(req).await }
        });

        // 응답 헤더를 받기 전에도 활성 연결로 잡혀야 함
        wait_for_active(agent.tracker(), 1).await;

        release_tx.send(()).unwrap();
        let (response, guard) = pending.await.unwrap().unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(agent.tracker().active(), 1);

        drop(guard);
        assert_eq!(agent.tracker().active(), 0);
    }

    #[tokio::test]
    async fn test_failed_request_releases_guard() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let agent = Agent::new();
        let req = Request::get(format!("http://{}/", addr))
            .body(empty_body())
            .unwrap();
        assert!(agent.request(req).await.is_err());
        assert_eq!(agent.tracker().active(), 0);
    }
}
