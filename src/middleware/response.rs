use hyper::{Response, StatusCode};
use tracing::warn;

use super::{full_body, BoxBody, MiddlewareError};

/// 미들웨어 에러를 HTTP 응답으로 변환합니다.
pub fn handle_middleware_error(err: MiddlewareError) -> Response<BoxBody> {
    let status = match &err {
        MiddlewareError::Status { status, .. } => *status,
        MiddlewareError::Body(_) => StatusCode::BAD_REQUEST,
        MiddlewareError::Config(_)
        | MiddlewareError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status.is_server_error() {
        warn!(error = %err, status = %status, "미들웨어 처리 실패");
    }

    error_response(status, err.to_string())
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response<BoxBody> {
    let mut response = Response::new(full_body(message.into()));
    *response.status_mut() = status;
    response
}

/// 아무 미들웨어도 응답하지 않았을 때의 기본 응답
pub fn not_found() -> Response<BoxBody> {
    error_response(StatusCode::NOT_FOUND, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_keeps_status() {
        let res = handle_middleware_error(MiddlewareError::status(StatusCode::FORBIDDEN, "denied"));
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_config_error_is_internal() {
        let res = handle_middleware_error(MiddlewareError::Config("bad".into()));
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
