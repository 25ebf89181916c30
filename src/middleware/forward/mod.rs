//! 요청을 업스트림으로 전달하고 응답을 컨텍스트로 옮기는 미들웨어

mod agent;
mod config;
mod error;
mod target;

pub use agent::{Agent, TrackedBody};
pub use config::ForwardConfig;
pub use error::ForwardError;
pub use target::{resolve_target, Target};

use async_trait::async_trait;
use http_body_util::BodyExt;
use hyper::header::{HeaderMap, HeaderValue, CONNECTION, CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use hyper::{Request, StatusCode};
use tracing::{debug, info};

use super::throttle::{ThrottleRate, Throttled};
use super::{full_body, Body, BoxBody, Context, Middleware, MiddlewareError, Next};

/// 업스트림이 정하는 전송 관련 헤더 (서버가 다시 붙임)
const HOP_HEADERS: [&str; 4] = ["connection", "keep-alive", "transfer-encoding", "proxy-connection"];

pub struct Forward {
    config: ForwardConfig,
}

impl Forward {
    pub fn new(config: ForwardConfig) -> Self {
        Self { config }
    }

    fn throttle_rate(&self) -> Option<ThrottleRate> {
        let bps = self.config.bps?;
        if self.config.global_bps {
            Some(ThrottleRate::Shared {
                bps,
                tracker: self.config.agent.tracker().clone(),
            })
        } else {
            Some(ThrottleRate::Fixed(bps))
        }
    }

    fn fail(&self, ctx: &mut Context, err: ForwardError) {
        (self.config.on_error)(&err, &ctx.req);
        ctx.res.status = StatusCode::BAD_GATEWAY;
        ctx.body = Body::from("Proxy Error: Bad Gateway");
    }
}

fn strip_hop_headers(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_HEADERS {
        headers.remove(name);
    }
    headers
}

/// 키 단위로 덮어쓰며 합칩니다.
fn merge_headers(target: &mut HeaderMap, source: HeaderMap) {
    for name in source.keys() {
        target.remove(name);
    }
    for (name, value) in source.iter() {
        target.append(name.clone(), value.clone());
    }
}

#[async_trait]
impl Middleware for Forward {
    fn name(&self) -> &str {
        "forward"
    }

    async fn handle(&self, ctx: &mut Context, _next: Next<'_>) -> Result<(), MiddlewareError> {
        let host = ctx.header(HOST.as_str());
        let uri = match resolve_target(self.config.target.as_ref(), ctx.req.uri(), host.as_deref()) {
            Ok(uri) => match &self.config.handle_url {
                Some(hook) => hook(uri),
                None => uri,
            },
            Err(e) => {
                self.fail(ctx, e);
                return Ok(());
            }
        };

        let mut headers = match &self.config.handle_req_headers {
            Some(hook) => hook(ctx.req.headers().clone(), &ctx.req),
            None => ctx.req.headers().clone(),
        };
        if self.config.force_header_host && self.config.target.is_some() {
            if let Some(authority) = uri.authority() {
                if let Ok(value) = HeaderValue::from_str(authority.as_str()) {
                    headers.insert(HOST, value);
                }
            }
        }
        headers.remove(CONNECTION);

        let body = match &ctx.req_body {
            Some(collected) => {
                headers.remove(TRANSFER_ENCODING);
                headers.insert(CONTENT_LENGTH, HeaderValue::from(collected.len()));
                full_body(collected.clone())
            }
            None => ctx.take_request_body(),
        };

        let mut upstream = Request::new(body);
        *upstream.method_mut() = ctx.req.method().clone();
        *upstream.uri_mut() = uri.clone();
        *upstream.headers_mut() = headers;

        debug!(method = %ctx.req.method(), upstream = %uri, "업스트림으로 포워딩");

        let (response, guard) = match self.config.agent.request(upstream).await {
            Ok(result) => result,
            Err(e) => {
                self.fail(ctx, ForwardError::Upstream(e));
                return Ok(());
            }
        };

        let (parts, body) = response.into_parts();
        info!(upstream = %uri, status = %parts.status, "업스트림 응답 수신");

        let mut res_headers = strip_hop_headers(parts.headers.clone());
        let body: BoxBody = body.map_err(Into::into).boxed_unsync();

        let body = match &self.config.handle_res_body {
            Some(hook) => {
                let collected = match body.collect().await {
                    Ok(collected) => collected.to_bytes(),
                    Err(e) => {
                        self.fail(ctx, ForwardError::Body(e.to_string()));
                        return Ok(());
                    }
                };
                drop(guard);
                res_headers.remove(CONTENT_LENGTH);
                hook(collected, &ctx.req, &parts)
            }
            None => {
                let tracked = TrackedBody::new(body, guard);
                match self.throttle_rate() {
                    Some(rate) => Body::stream(Throttled::new(tracked.boxed_unsync(), rate)),
                    None => Body::stream(tracked),
                }
            }
        };
        ctx.body = body;

        if let Some(hook) = &self.config.handle_res_headers {
            res_headers = hook(res_headers, &ctx.req, parts.status);
        }
        ctx.res.status = parts.status;
        merge_headers(&mut ctx.res.headers, res_headers);
        Ok(())
    }
}
