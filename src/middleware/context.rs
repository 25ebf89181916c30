use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty, Full};
use hyper::header::HeaderMap;
use hyper::{Request, Response, StatusCode};

use super::select::Capture;
use super::MiddlewareError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 요청/응답 본문 공통 타입
pub type BoxBody = http_body_util::combinators::UnsyncBoxBody<Bytes, BoxError>;

pub fn empty_body() -> BoxBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

pub fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// 미들웨어가 채우는 응답 본문 슬롯
#[derive(Default)]
pub enum Body {
    #[default]
    Empty,
    Bytes(Bytes),
    /// 스트림 본문 (ETag 계산 대상이 아님)
    Stream(BoxBody),
}

impl Body {
    pub fn stream<B>(body: B) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Body::Stream(body.map_err(Into::into).boxed_unsync())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn into_box_body(self) -> BoxBody {
        match self {
            Body::Empty => empty_body(),
            Body::Bytes(bytes) => full_body(bytes),
            Body::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(bytes) => write!(f, "Body::Bytes({} bytes)", bytes.len()),
            Body::Stream(_) => write!(f, "Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Body::Bytes(bytes)
    }
}

impl From<Vec<u8>> for Body {
    fn from(data: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(data))
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Body::Bytes(Bytes::from(text))
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(text.as_bytes()))
    }
}

/// 나가는 응답의 상태/헤더
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
    finished: bool,
}

impl ResponseHead {
    /// 응답이 이미 종료되었는지 (본문은 버려지고 이후 변경 금지)
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Default for ResponseHead {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            finished: false,
        }
    }
}

/// 요청 하나당 하나씩 생성되는 미들웨어 공유 컨텍스트
pub struct Context {
    pub req: Request<BoxBody>,
    pub res: ResponseHead,
    pub body: Body,
    /// BodyCollector 등이 모아 둔 요청 본문
    pub req_body: Option<Bytes>,
    /// 셀렉터 캡처
    pub method: Option<Capture>,
    pub url: Option<Capture>,
    pub headers: HashMap<String, Capture>,
    /// 미들웨어가 임의로 설정하는 값
    pub fields: HashMap<String, Capture>,
    exhausted: bool,
}

impl Context {
    pub fn new(req: Request<BoxBody>) -> Self {
        Self {
            req,
            res: ResponseHead::default(),
            body: Body::Empty,
            req_body: None,
            method: None,
            url: None,
            headers: HashMap::new(),
            fields: HashMap::new(),
            exhausted: false,
        }
    }

    pub fn from_request<B>(req: Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self::new(req.map(|body| body.map_err(Into::into).boxed_unsync()))
    }

    /// 요청 헤더 값 (여러 값은 ", "로 합침)
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self.req.headers()
            .get_all(name)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(", "))
        }
    }

    /// 셀렉터가 잘라 낸 url 나머지, 없으면 요청 경로
    pub fn url_path(&self) -> String {
        match &self.url {
            Some(Capture::Text(rest)) => rest.clone(),
            _ => self.req.uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string()),
        }
    }

    /// 요청 본문 스트림을 꺼냅니다. 이후 요청 본문은 비어 있습니다.
    pub fn take_request_body(&mut self) -> BoxBody {
        std::mem::replace(self.req.body_mut(), empty_body())
    }

    /// 요청 본문 전체를 읽습니다. 이미 읽었다면 저장된 값을 돌려줍니다.
    pub async fn read_body(&mut self) -> Result<Bytes, MiddlewareError> {
        if let Some(body) = &self.req_body {
            return Ok(body.clone());
        }

        let collected = self.take_request_body()
            .collect()
            .await
            .map_err(|e| MiddlewareError::Body(e.to_string()))?
            .to_bytes();
        self.req_body = Some(collected.clone());
        Ok(collected)
    }

    /// 응답을 종료합니다. 본문은 버려집니다.
    pub fn end(&mut self) {
        self.res.finished = true;
        self.body = Body::Empty;
    }

    pub(crate) fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// 체인 끝까지 내려갔지만 아무도 응답을 만들지 않은 경우
    pub fn is_unhandled(&self) -> bool {
        self.exhausted && self.body.is_empty() && !self.res.finished
    }

    pub fn into_response(self) -> Response<BoxBody> {
        let body = if self.res.finished {
            empty_body()
        } else {
            self.body.into_box_body()
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.res.status;
        *response.headers_mut() = self.res.headers;
        response
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("method", self.req.method())
            .field("uri", self.req.uri())
            .field("status", &self.res.status)
            .field("body", &self.body)
            .field("url", &self.url)
            .finish()
    }
}
