//! 개발용 보조 엔드포인트: SSE 이벤트 채널, 클라이언트 로그 수집, 파일 변경 알림

mod sse;
mod watcher;

pub use sse::{SseEvent, SseHub};
pub use watcher::{FileEvent, FileWatcher};

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hyper::header::{HeaderValue, CACHE_CONTROL, CONTENT_TYPE};
use hyper::StatusCode;
use tracing::{debug, info, warn};

use super::{Body, Context, Middleware, MiddlewareError, Next};
use crate::settings::HelperSettings;

/// 파일 변경을 알리는 SSE 이벤트 이름
pub const FILE_MODIFIED_EVENT: &str = "fileModified";

#[derive(Debug, Clone)]
pub struct HelperConfig {
    pub sse_prefix: String,
    pub log_prefix: String,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            sse_prefix: "/proxy-sse".to_string(),
            log_prefix: "/proxy-log".to_string(),
        }
    }
}

impl From<&HelperSettings> for HelperConfig {
    fn from(settings: &HelperSettings) -> Self {
        Self {
            sse_prefix: settings.sse_prefix.clone(),
            log_prefix: settings.log_prefix.clone(),
        }
    }
}

struct Inner {
    config: HelperConfig,
    sse: SseHub,
    watched: Mutex<HashSet<PathBuf>>,
}

/// 보조 엔드포인트를 가로채고 나머지는 다음 미들웨어로 넘깁니다.
#[derive(Clone)]
pub struct ServerHelper {
    inner: Arc<Inner>,
}

impl ServerHelper {
    pub fn new(config: HelperConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                sse: SseHub::default(),
                watched: Mutex::new(HashSet::new()),
            }),
        }
    }

    pub fn sse(&self) -> &SseHub {
        &self.inner.sse
    }

    /// 파일이 바뀌면 `url`을 데이터로 `fileModified` 이벤트를 보냅니다.
    ///
    /// 이미 감시 중이거나 파일이 없으면 `false`를 반환합니다.
    pub async fn watch(&self, path: impl AsRef<Path>, url: impl Into<String>) -> Result<bool, MiddlewareError> {
        let path = path.as_ref().to_path_buf();
        if self.is_watching(&path) {
            return Ok(false);
        }
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "감시할 파일이 없음");
            return Ok(false);
        }

        let mut watcher = FileWatcher::new(&path);
        watcher.start()
            .map_err(|e| MiddlewareError::Config(format!("파일 감시 시작 실패 {}: {}", path.display(), e)))?;

        {
            let mut watched = self.inner.watched.lock().unwrap_or_else(|e| e.into_inner());
            if !watched.insert(path.clone()) {
                return Ok(false);
            }
        }
        info!(path = %path.display(), "파일 감시 시작");

        let hub = self.inner.sse.clone();
        let url = url.into();
        tokio::spawn(async move {
            while let Some(event) = watcher.next_event().await {
                if let FileEvent::Modified(changed) = event {
                    info!(path = %changed.display(), "파일 변경됨");
                    hub.emit(FILE_MODIFIED_EVENT, url.clone());
                }
            }
        });
        Ok(true)
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.inner.watched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(path)
    }

    fn open_sse(&self, ctx: &mut Context) {
        ctx.res.status = StatusCode::OK;
        ctx.res.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        ctx.res.headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        ctx.body = Body::Stream(self.inner.sse.stream_body());
        debug!(clients = self.inner.sse.client_count(), "SSE 클라이언트 연결");
    }

    async fn client_log(&self, ctx: &mut Context) -> Result<(), MiddlewareError> {
        let body = ctx.read_body().await?;

        if body.is_empty() {
            info!("client |");
        } else {
            match serde_json::from_slice::<serde_json::Value>(&body) {
                Ok(value) => {
                    let pretty = serde_json::to_string_pretty(&value).unwrap_or_default();
                    info!("client | {}", pretty);
                }
                Err(e) => {
                    warn!(error = %e, "클라이언트 로그 파싱 실패");
                    ctx.res.status = StatusCode::INTERNAL_SERVER_ERROR;
                    ctx.body = Body::from(e.to_string());
                    return Ok(());
                }
            }
        }

        ctx.end();
        Ok(())
    }
}

impl Default for ServerHelper {
    fn default() -> Self {
        Self::new(HelperConfig::default())
    }
}

#[async_trait]
impl Middleware for ServerHelper {
    fn name(&self) -> &str {
        "server-helper"
    }

    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), MiddlewareError> {
        let path = ctx.req.uri().path().to_string();
        if path == self.inner.config.sse_prefix {
            self.open_sse(ctx);
            Ok(())
        } else if path == self.inner.config.log_prefix {
            self.client_log(ctx).await
        } else {
            next.run(ctx).await
        }
    }
}
