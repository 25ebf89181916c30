use hyper::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum MiddlewareError {
    #[error("설정 오류: {0}")]
    Config(String),

    /// 특정 HTTP 상태로 응답해야 하는 실패
    #[error("{status}: {message}")]
    Status {
        status: StatusCode,
        message: String,
    },

    #[error("요청 본문 읽기 실패: {0}")]
    Body(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MiddlewareError {
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }
}
