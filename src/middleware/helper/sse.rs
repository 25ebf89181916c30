use bytes::Bytes;
use futures_util::stream;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::middleware::{BoxBody, BoxError};

#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

impl SseEvent {
    /// text/event-stream 형식으로 직렬화합니다. 여러 줄 데이터는 줄마다 `data:`를 붙입니다.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = format!("event: {}\n", self.event);
        for line in self.data.split('\n') {
            out.push_str("data: ");
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
        Bytes::from(out)
    }
}

/// 연결된 모든 SSE 클라이언트로 이벤트를 보냅니다.
#[derive(Debug, Clone)]
pub struct SseHub {
    tx: broadcast::Sender<SseEvent>,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트를 받은 클라이언트 수를 반환합니다.
    pub fn emit(&self, event: impl Into<String>, data: impl Into<String>) -> usize {
        let event = SseEvent {
            event: event.into(),
            data: data.into(),
        };
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SseEvent> {
        self.tx.subscribe()
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// 구독 하나를 응답 본문 스트림으로 만듭니다.
    pub fn stream_body(&self) -> BoxBody {
        let events = stream::unfold(self.subscribe(), |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((Ok::<_, BoxError>(Frame::data(event.to_bytes())), rx)),
                    Err(RecvError::Lagged(skipped)) => warn!(skipped, "SSE 클라이언트가 이벤트를 놓침"),
                    Err(RecvError::Closed) => return None,
                }
            }
        });
        StreamBody::new(events).boxed_unsync()
    }
}

impl Default for SseHub {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_format() {
        let event = SseEvent { event: "fileModified".into(), data: "/a.js".into() };
        assert_eq!(event.to_bytes(), Bytes::from("event: fileModified\ndata: /a.js\n\n"));
    }

    #[test]
    fn test_emit_without_clients() {
        assert_eq!(SseHub::default().emit("x", "y"), 0);
    }

    #[tokio::test]
    async fn test_stream_body_receives_events() {
        let hub = SseHub::default();
        let mut body = hub.stream_body();
        assert_eq!(hub.client_count(), 1);

        hub.emit("ping", "1");
        let frame = body.frame().await.unwrap().unwrap();
        assert_eq!(frame.into_data().unwrap(), Bytes::from("event: ping\ndata: 1\n\n"));
    }
}
