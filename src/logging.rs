use std::path::Path;

use time::format_description::well_known::Rfc3339;
use tracing::{debug, error, info, span, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use crate::settings::logging::{LogFormat, LogOutput};
use crate::settings::{LogSettings, SettingsError};

/// 설정에 따라 전역 구독자를 설치합니다.
///
/// 반환된 가드가 drop되면 남은 로그를 비우고 기록을 멈추므로 `main`이 끝날 때까지 들고 있어야 합니다.
pub fn init_logging(settings: &LogSettings) -> Result<WorkerGuard, SettingsError> {
    let level = settings.level.to_string().to_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},intercept_proxy={}", level, level)));

    let (writer, guard) = match &settings.output {
        LogOutput::Stdout => tracing_appender::non_blocking(std::io::stdout()),
        LogOutput::File(path) => {
            let path = Path::new(path);
            let file_name = path.file_name().ok_or_else(|| {
                SettingsError::Logging(format!("파일 이름이 없는 경로: {}", path.display()))
            })?;
            let dir = path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name))
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_timer(UtcTime::new(Rfc3339))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let installed = match settings.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| SettingsError::Logging(e.to_string()))?;

    Ok(guard)
}

/// 요청 하나의 처리 결과를 한 줄로 남기기 위한 기록
#[derive(Debug)]
pub struct RequestLog {
    pub request_id: String,
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub host: String,
    pub status_code: u16,
    pub duration_ms: u64,
    pub error: Option<String>,
}

impl RequestLog {
    pub fn new(request_id: String) -> Self {
        Self {
            request_id,
            method: String::new(),
            path: String::new(),
            query: None,
            host: String::new(),
            status_code: 0,
            duration_ms: 0,
            error: None,
        }
    }

    pub fn with_request<B>(&mut self, req: &hyper::Request<B>) {
        self.method = req.method().to_string();
        self.path = req.uri().path().to_string();
        self.query = req.uri().query().map(str::to_string);
        self.host = req.headers()
            .get(hyper::header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| req.uri().authority().map(|a| a.as_str()))
            .unwrap_or_default()
            .to_string();

        debug!(
            request_id = %self.request_id,
            method = %self.method,
            path = %self.path,
            host = %self.host,
            "요청 수신"
        );
    }

    pub fn with_response(&mut self, status: hyper::StatusCode) {
        self.status_code = status.as_u16();
    }

    pub fn with_error(&mut self, error: impl std::fmt::Display) {
        let message = error.to_string();
        error!(request_id = %self.request_id, error = %message, "요청 처리 중 오류");
        self.error = Some(message);
    }
}

pub fn log_request(log: &RequestLog) {
    let span = span!(
        Level::INFO,
        "request",
        request_id = %log.request_id,
        method = %log.method,
        path = %log.path,
        host = %log.host,
        status = log.status_code,
        duration_ms = log.duration_ms
    );
    let _enter = span.enter();

    if let Some(err) = &log.error {
        error!(error = %err, query = ?log.query, "요청 실패");
    } else if log.status_code >= 400 {
        warn!(query = ?log.query, "오류 상태로 응답");
    } else {
        info!(query = ?log.query, "요청 완료");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Empty;
    use bytes::Bytes;

    #[test]
    fn test_request_log_captures_request() {
        let req = hyper::Request::builder()
            .uri("http://example.com/a?b=1")
            .header("host", "example.com")
            .body(Empty::<Bytes>::new())
            .unwrap();

        let mut log = RequestLog::new("id-1".to_string());
        log.with_request(&req);
        log.with_response(hyper::StatusCode::NOT_FOUND);

        assert_eq!(log.method, "GET");
        assert_eq!(log.path, "/a");
        assert_eq!(log.query.as_deref(), Some("b=1"));
        assert_eq!(log.host, "example.com");
        assert_eq!(log.status_code, 404);
        log_request(&log);
    }
}
