#![allow(dead_code)]

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::header::HeaderMap;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use intercept_proxy::server::RequestHandler;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// `/large` 요청에 돌려주는 본문 길이
pub const LARGE_BODY_SIZE: usize = 300;

fn header_text(headers: &HeaderMap, name: &str) -> String {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-")
        .to_string()
}

/// 요청 내용을 한 줄로 돌려주는 업스트림
async fn echo(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().to_string();
    let path = req.uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    let host = header_text(req.headers(), "host");
    let added = header_text(req.headers(), "x-added");

    if path == "/large" {
        return Ok(Response::new(Full::new(Bytes::from(vec![b'x'; LARGE_BODY_SIZE]))));
    }

    let body = req.into_body()
        .collect()
        .await
        .map(|c| c.to_bytes())
        .unwrap_or_default();
    let text = format!(
        "{} {} host={} added={} body={}",
        method,
        path,
        host,
        added,
        String::from_utf8_lossy(&body)
    );

    let response = Response::builder()
        .header("x-upstream", "echo")
        .header("content-type", "text/plain")
        .body(Full::new(Bytes::from(text)))
        .unwrap();
    Ok(response)
}

pub async fn spawn_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = http1::Builder::new()
                    .serve_connection(TokioIo::new(stream), service_fn(echo))
                    .await;
            });
        }
    });
    addr
}

/// 받은 바이트를 그대로 돌려주는 TCP 서버
pub async fn spawn_tcp_echo() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (mut reader, mut writer) = stream.split();
                let _ = tokio::io::copy(&mut reader, &mut writer).await;
            });
        }
    });
    addr
}

/// 연결마다 `handle_connection`을 실행하는 프록시
pub async fn spawn_proxy(handler: RequestHandler) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handler = Arc::new(handler);
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let handler = handler.clone();
            tokio::spawn(async move {
                let _ = handler.handle_connection(stream).await;
            });
        }
    });
    addr
}

/// `needle`이 나타날 때까지 읽고 지금까지 받은 바이트를 돌려줍니다.
pub async fn read_until<S>(stream: &mut S, needle: &[u8]) -> Vec<u8>
where
    S: AsyncRead + Unpin,
{
    let mut received = Vec::new();
    let mut buf = [0u8; 1024];
    while !received.windows(needle.len()).any(|w| w == needle) {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "연결이 먼저 닫힘: {:?}", String::from_utf8_lossy(&received));
        received.extend_from_slice(&buf[..n]);
    }
    received
}

/// 원시 HTTP/1.1 요청을 보내고 연결이 닫힐 때까지 응답을 읽습니다.
pub async fn raw_request(addr: SocketAddr, request: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    stream.read_to_end(&mut response).await.unwrap();
    String::from_utf8_lossy(&response).to_string()
}
