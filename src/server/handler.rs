use std::convert::Infallible;
use std::sync::Arc;
use std::time::Instant;

use bytes::BytesMut;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncWriteExt, AsyncRead, AsyncWrite};
use tracing::{debug, warn};
use uuid::Uuid;

use super::rewind::Rewind;
use super::Result;
use crate::logging::{log_request, RequestLog};
use crate::middleware::{error_response, handle_middleware_error, not_found, BoxBody, Context, Flow, Outcome};
use crate::tunnel::{read_head, ConnectHandler, TunnelError};

const HEAD_TOO_LARGE: &[u8] =
    b"HTTP/1.1 431 Request Header Fields Too Large\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";
const BAD_REQUEST: &[u8] = b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\nContent-Length: 0\r\n\r\n";

/// 연결 하나를 받아 CONNECT 터널과 HTTP 파이프라인 중 하나로 보냅니다.
pub struct RequestHandler {
    flow: Flow,
    connect: Option<Arc<dyn ConnectHandler>>,
}

impl RequestHandler {
    pub fn new(flow: Flow) -> Self {
        Self {
            flow,
            connect: None,
        }
    }

    pub fn with_connect_handler(mut self, handler: Arc<dyn ConnectHandler>) -> Self {
        self.connect = Some(handler);
        self
    }

    pub fn flow(&self) -> &Flow {
        &self.flow
    }

    pub async fn handle_request(
        &self,
        req: Request<Incoming>,
    ) -> std::result::Result<Response<BoxBody>, Infallible> {
        let start = Instant::now();
        let mut log = RequestLog::new(Uuid::new_v4().to_string());
        log.with_request(&req);

        // 터널은 연결의 첫 요청에서만 열 수 있음
        if req.method() == Method::CONNECT {
            let response = error_response(StatusCode::BAD_REQUEST, "CONNECT must be the first request on a connection");
            log.with_response(response.status());
            log_request(&log);
            return Ok(response);
        }

        let mut ctx = Context::from_request(req);
        let response = match self.flow.run(&mut ctx).await {
            Ok(Outcome::Handled) => ctx.into_response(),
            Ok(Outcome::Unhandled) => not_found(),
            Err(e) => {
                log.with_error(&e);
                handle_middleware_error(e)
            }
        };

        log.with_response(response.status());
        log.duration_ms = start.elapsed().as_millis() as u64;
        log_request(&log);
        Ok(response)
    }

    /// 요청 헤더를 먼저 읽어 CONNECT 인지 확인합니다.
    ///
    /// CONNECT면 소켓을 터널 처리기에 넘기고, 아니면 읽은 바이트를 되돌려 HTTP/1 서버로 처리합니다.
    pub async fn handle_connection<S>(self: Arc<Self>, mut stream: S) -> Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let mut buf = BytesMut::with_capacity(4096);
        let (head, consumed) = match read_head(&mut stream, &mut buf).await {
            Ok(Some(parsed)) => parsed,
            Ok(None) => return Ok(()),
            Err(TunnelError::HeadTooLarge { limit }) => {
                debug!(limit, "요청 헤더 크기 초과");
                let _ = stream.write_all(HEAD_TOO_LARGE).await;
                return Ok(());
            }
            Err(TunnelError::Handshake(msg)) => {
                debug!(reason = %msg, "잘못된 요청 헤더");
                let _ = stream.write_all(BAD_REQUEST).await;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if head.is_connect() {
            let leftover = buf.split_off(consumed).freeze();
            match &self.connect {
                Some(handler) => {
                    if let Err(e) = handler.handle(head, Box::new(stream), leftover).await {
                        debug!(error = %e, "CONNECT 처리 종료");
                    }
                }
                None => warn!(target = %head.target, "CONNECT 처리기가 없어 연결을 닫습니다"),
            }
            return Ok(());
        }

        let io = TokioIo::new(Rewind::new(stream, buf.freeze()));
        let handler = self.clone();
        http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req| {
                    let handler = handler.clone();
                    async move { handler.handle_request(req).await }
                }),
            )
            .await?;
        Ok(())
    }
}
