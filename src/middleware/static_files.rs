use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::StatusCode;
use tracing::debug;

use super::{Body, Context, Middleware, MiddlewareError, Next};

/// 루트 디렉토리 아래 파일을 제공합니다. 파일이 없으면 다음 미들웨어로 넘깁니다.
///
/// 셀렉터가 url 나머지를 캡처했다면 그 값을 경로로 씁니다.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: PathBuf,
    index: String,
}

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") | Some("mjs") => "application/javascript; charset=utf-8",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("ico") => "image/x-icon",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}

impl StaticFiles {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            index: "index.html".to_string(),
        }
    }

    pub fn index(mut self, index: impl Into<String>) -> Self {
        self.index = index.into();
        self
    }

    /// 요청 경로를 루트 기준 경로로 바꿉니다. 상위 디렉토리 참조가 있으면 None
    fn resolve(&self, url: &str) -> Option<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or("");
        let relative = Path::new(path.trim_start_matches('/'));

        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(resolved)
    }
}

#[async_trait]
impl Middleware for StaticFiles {
    fn name(&self) -> &str {
        "static-files"
    }

    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), MiddlewareError> {
        let url = ctx.url_path();
        let Some(mut path) = self.resolve(&url) else {
            ctx.res.status = StatusCode::FORBIDDEN;
            ctx.body = Body::from("Forbidden");
            return Ok(());
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => path.push(&self.index),
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return next.run(ctx).await,
            Err(e) => return Err(e.into()),
        }

        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(path = %path.display(), bytes = data.len(), "정적 파일 제공");
                ctx.res.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));
                ctx.body = Body::from(data);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => next.run(ctx).await,
            Err(e) => Err(e.into()),
        }
    }
}
