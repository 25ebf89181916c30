mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use intercept_proxy::middleware::{Flow, Select};
use intercept_proxy::server::RequestHandler;
use intercept_proxy::tunnel::{
    ConnectClient, ConnectServant, ConnectTunnel, FrameHandler, FrameWriter, RequestHead, TunnelError,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn tunnel_handler(tunnel: ConnectTunnel) -> RequestHandler {
    RequestHandler::new(Flow::new()).with_connect_handler(Arc::new(tunnel))
}

#[tokio::test]
async fn test_proxy_form_connect_relays_bytes() {
    let echo = common::spawn_tcp_echo().await;
    let proxy = common::spawn_proxy(tunnel_handler(ConnectTunnel::new())).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!(
        "CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Connection: keep-alive\r\n\r\n",
        echo
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let reply = common::read_until(&mut stream, b"\r\n\r\n").await;
    assert_eq!(reply, b"HTTP/1.1 200 Connection established\r\n\r\n");

    stream.write_all(b"ping").await.unwrap();
    let echoed = common::read_until(&mut stream, b"ping").await;
    assert_eq!(echoed, b"ping");
}

#[tokio::test]
async fn test_bytes_after_head_reach_target() {
    let echo = common::spawn_tcp_echo().await;
    let proxy = common::spawn_proxy(tunnel_handler(ConnectTunnel::new())).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!(
        "CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Connection: keep-alive\r\n\r\nearly",
        echo
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let received = common::read_until(&mut stream, b"early").await;
    assert_eq!(received, b"HTTP/1.1 200 Connection established\r\n\r\nearly");
}

#[tokio::test]
async fn test_non_proxy_form_replays_head_to_target() {
    let echo = common::spawn_tcp_echo().await;
    let proxy = common::spawn_proxy(tunnel_handler(ConnectTunnel::new())).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    let request = format!("CONNECT /socket HTTP/1.1\r\nHost: {}\r\nX-Trace: 1\r\n\r\n", echo);
    stream.write_all(request.as_bytes()).await.unwrap();

    // 에코 대상이 다시 쓴 원래 헤더를 그대로 돌려줌
    let replayed = common::read_until(&mut stream, b"\r\n\r\n").await;
    assert_eq!(String::from_utf8(replayed).unwrap(), request);
}

#[tokio::test]
async fn test_forced_host_overrides_request_target() {
    let echo = common::spawn_tcp_echo().await;
    let tunnel = ConnectTunnel::new().host(&echo.to_string());
    let proxy = common::spawn_proxy(tunnel_handler(tunnel)).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream
        .write_all(b"CONNECT nowhere.invalid:1 HTTP/1.1\r\nProxy-Connection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    common::read_until(&mut stream, b"\r\n\r\n").await;

    stream.write_all(b"forced").await.unwrap();
    assert_eq!(common::read_until(&mut stream, b"forced").await, b"forced");
}

#[tokio::test]
async fn test_dial_failure_reports_error_and_closes() {
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let tunnel = ConnectTunnel::new().on_error(move |err, req| {
        let is_dial = matches!(err, TunnelError::Dial { .. });
        let _ = tx.send((is_dial, err.side(), req.target.clone()));
    });
    let proxy = common::spawn_proxy(tunnel_handler(tunnel)).await;

    let request = format!("CONNECT {0} HTTP/1.1\r\nHost: {0}\r\nProxy-Connection: keep-alive\r\n\r\n", closed);
    let response = common::raw_request(proxy, &request).await;
    assert!(response.is_empty());

    let (is_dial, side, target) = rx.recv().await.unwrap();
    assert!(is_dial);
    assert_eq!(side, None);
    assert_eq!(target, closed.to_string());
}

#[tokio::test]
async fn test_connect_after_keep_alive_request_is_rejected() {
    let handler = RequestHandler::new(Flow::new().with(Select::body("/", "ok")))
        .with_connect_handler(Arc::new(ConnectTunnel::new()));
    let proxy = common::spawn_proxy(handler).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(b"GET / HTTP/1.1\r\nHost: proxy\r\n\r\n").await.unwrap();
    let first = common::read_until(&mut stream, b"\r\n\r\nok").await;
    assert!(first.starts_with(b"HTTP/1.1 200"));

    stream
        .write_all(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n")
        .await
        .unwrap();
    let second = common::read_until(&mut stream, b"\r\n\r\n").await;
    assert!(second.starts_with(b"HTTP/1.1 400"), "{}", String::from_utf8_lossy(&second));
}

#[tokio::test]
async fn test_connect_without_handler_closes() {
    let proxy = common::spawn_proxy(RequestHandler::new(Flow::new())).await;
    let response = common::raw_request(proxy, "CONNECT example.com:443 HTTP/1.1\r\n\r\n").await;
    assert!(response.is_empty());
}

/// 받은 프레임을 그대로 돌려보내는 서버 측 처리기
#[derive(Default)]
struct EchoFrames {
    writer: Mutex<Option<FrameWriter>>,
    origins: Mutex<Vec<String>>,
}

#[async_trait]
impl FrameHandler for EchoFrames {
    async fn on_connect(&self, origin: &RequestHead, writer: FrameWriter) {
        self.origins.lock().unwrap().push(origin.target.clone());
        *self.writer.lock().unwrap() = Some(writer);
    }

    async fn on_frame(&self, payload: Bytes) {
        let writer = self.writer.lock().unwrap().clone();
        if let Some(writer) = writer {
            let _ = writer.write(payload).await;
        }
    }
}

/// 접속하면 준비된 프레임을 보내고 받은 프레임을 채널로 넘기는 클라이언트 측 처리기
struct Greeter {
    greetings: Vec<Bytes>,
    received: mpsc::UnboundedSender<Bytes>,
}

#[async_trait]
impl FrameHandler for Greeter {
    async fn on_connect(&self, _origin: &RequestHead, writer: FrameWriter) {
        for greeting in &self.greetings {
            writer.write(greeting.clone()).await.unwrap();
        }
    }

    async fn on_frame(&self, payload: Bytes) {
        let _ = self.received.send(payload);
    }
}

#[tokio::test]
async fn test_frame_session_between_client_and_servant() {
    let servant_handler = Arc::new(EchoFrames::default());
    let servant = ConnectServant::shared(servant_handler.clone())
        .filter(|req| req.target == "/frames");
    let proxy = common::spawn_proxy(
        RequestHandler::new(Flow::new()).with_connect_handler(Arc::new(servant)),
    ).await;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let big = Bytes::from(vec![0x5A; 20 * 1024]);
    let client = ConnectClient::new(Greeter {
        greetings: vec![Bytes::from("ping"), Bytes::new(), big.clone()],
        received: tx,
    })
    .host("127.0.0.1")
    .port(proxy.port())
    .url("/frames")
    .spawn();

    let wait = Duration::from_secs(5);
    assert_eq!(timeout(wait, rx.recv()).await.unwrap().unwrap(), Bytes::from("ping"));
    assert_eq!(timeout(wait, rx.recv()).await.unwrap().unwrap(), Bytes::new());
    assert_eq!(timeout(wait, rx.recv()).await.unwrap().unwrap(), big);
    assert_eq!(*servant_handler.origins.lock().unwrap(), vec!["/frames".to_string()]);

    client.abort();
}

#[tokio::test]
async fn test_client_without_retry_returns_dial_error() {
    let closed = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let client = ConnectClient::new(Greeter { greetings: Vec::new(), received: tx })
        .port(closed.port());

    let result = client.run().await;
    assert!(matches!(result, Err(TunnelError::Dial { .. })));
}

#[tokio::test]
async fn test_oversized_frame_ends_servant_session() {
    let servant = ConnectServant::new(EchoFrames::default()).max_frame_size(8);
    let proxy = common::spawn_proxy(
        RequestHandler::new(Flow::new()).with_connect_handler(Arc::new(servant)),
    ).await;

    let mut stream = TcpStream::connect(proxy).await.unwrap();
    stream.write_all(b"CONNECT / HTTP/1.1\r\n\r\n").await.unwrap();
    stream.write_all(&[9, 0, 0, 0]).await.unwrap();

    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(5), stream.read(&mut buf)).await.unwrap().unwrap_or(0);
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_client_retries_until_listener_appears() {
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let (tx, _rx) = mpsc::unbounded_channel();
    let client = ConnectClient::new(Greeter { greetings: Vec::new(), received: tx })
        .port(addr.port())
        .url("/x")
        .retry(Duration::from_millis(50))
        .spawn();

    // 처음 몇 번은 연결이 거부되어야 재시도가 일어남
    tokio::time::sleep(Duration::from_millis(100)).await;
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    let (mut stream, _) = timeout(Duration::from_secs(5), listener.accept()).await.unwrap().unwrap();
    let head = common::read_until(&mut stream, b"\r\n\r\n").await;
    assert_eq!(head, b"CONNECT /x HTTP/1.1\r\n\r\n");

    // 상대가 정상 종료하면 다시 접속하지 않고 끝남
    drop(stream);
    let result = timeout(Duration::from_secs(5), client).await.unwrap().unwrap();
    assert!(result.is_ok());
    assert!(timeout(Duration::from_millis(200), listener.accept()).await.is_err());
}
