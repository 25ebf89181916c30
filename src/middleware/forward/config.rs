use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use hyper::header::HeaderMap;
use hyper::{Request, StatusCode, Uri};
use tracing::warn;

use super::{Agent, ForwardError, Target};
use crate::middleware::{Body, BoxBody};
use crate::settings::ForwardSettings;

pub type UrlHook = Arc<dyn Fn(Uri) -> Uri + Send + Sync>;
pub type RequestHeadersHook = Arc<dyn Fn(HeaderMap, &Request<BoxBody>) -> HeaderMap + Send + Sync>;
pub type ResponseHeadersHook =
    Arc<dyn Fn(HeaderMap, &Request<BoxBody>, StatusCode) -> HeaderMap + Send + Sync>;
pub type ResponseBodyHook =
    Arc<dyn Fn(Bytes, &Request<BoxBody>, &hyper::http::response::Parts) -> Body + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&ForwardError, &Request<BoxBody>) + Send + Sync>;

/// 포워딩 미들웨어 설정
#[derive(Clone)]
pub struct ForwardConfig {
    pub(crate) target: Option<Target>,
    pub(crate) agent: Agent,
    pub(crate) force_header_host: bool,
    pub(crate) bps: Option<u64>,
    pub(crate) global_bps: bool,
    pub(crate) handle_url: Option<UrlHook>,
    pub(crate) handle_req_headers: Option<RequestHeadersHook>,
    pub(crate) handle_res_headers: Option<ResponseHeadersHook>,
    pub(crate) handle_res_body: Option<ResponseBodyHook>,
    pub(crate) on_error: ErrorHook,
}

impl ForwardConfig {
    pub fn new(agent: Agent) -> Self {
        Self {
            target: None,
            agent,
            force_header_host: true,
            bps: None,
            global_bps: false,
            handle_url: None,
            handle_req_headers: None,
            handle_res_headers: None,
            handle_res_body: None,
            on_error: Arc::new(|err, req| {
                warn!(error = %err, uri = %req.uri(), "포워딩 실패");
            }),
        }
    }

    pub fn from_settings(settings: &ForwardSettings, agent: Agent) -> Self {
        let mut config = Self::new(agent).force_header_host(settings.force_header_host);
        if let Some(target) = &settings.target {
            config = config.target(target.as_str());
        }
        if let Some(bps) = settings.bps {
            config = config.bps(bps).global_bps(settings.global_bps);
        }
        config
    }

    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// 대상이 있을 때 Host 헤더를 대상 호스트로 덮어쓸지 (기본값 true)
    pub fn force_header_host(mut self, force: bool) -> Self {
        self.force_header_host = force;
        self
    }

    /// 응답 본문 전송 속도 제한 (초당 바이트). 0이면 제한 없음
    pub fn bps(mut self, bps: u64) -> Self {
        self.bps = (bps > 0).then_some(bps);
        self
    }

    /// bps를 같은 에이전트의 활성 연결이 나눠 쓰게 합니다.
    pub fn global_bps(mut self, global: bool) -> Self {
        self.global_bps = global;
        self
    }

    pub fn handle_url<F>(mut self, f: F) -> Self
    where
        F: Fn(Uri) -> Uri + Send + Sync + 'static,
    {
        self.handle_url = Some(Arc::new(f));
        self
    }

    pub fn handle_req_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(HeaderMap, &Request<BoxBody>) -> HeaderMap + Send + Sync + 'static,
    {
        self.handle_req_headers = Some(Arc::new(f));
        self
    }

    pub fn handle_res_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(HeaderMap, &Request<BoxBody>, StatusCode) -> HeaderMap + Send + Sync + 'static,
    {
        self.handle_res_headers = Some(Arc::new(f));
        self
    }

    /// 설정하면 업스트림 본문을 모두 모은 뒤 이 함수의 결과로 응답합니다.
    pub fn handle_res_body<F>(mut self, f: F) -> Self
    where
        F: Fn(Bytes, &Request<BoxBody>, &hyper::http::response::Parts) -> Body + Send + Sync + 'static,
    {
        self.handle_res_body = Some(Arc::new(f));
        self
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&ForwardError, &Request<BoxBody>) + Send + Sync + 'static,
    {
        self.on_error = Arc::new(f);
        self
    }
}

impl fmt::Debug for ForwardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForwardConfig")
            .field("target", &self.target)
            .field("force_header_host", &self.force_header_host)
            .field("bps", &self.bps)
            .field("global_bps", &self.global_bps)
            .field("handle_res_body", &self.handle_res_body.is_some())
            .finish()
    }
}
