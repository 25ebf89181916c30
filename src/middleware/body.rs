use async_trait::async_trait;
use tracing::debug;

use super::{Context, Middleware, MiddlewareError, Next};

/// 요청 본문을 모두 읽어 `ctx.req_body`에 저장한 뒤 다음으로 넘깁니다. 빈 본문은 저장하지 않습니다.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyCollector;

impl BodyCollector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Middleware for BodyCollector {
    fn name(&self) -> &str {
        "body-collector"
    }

    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), MiddlewareError> {
        let body = ctx.read_body().await?;
        if body.is_empty() {
            ctx.req_body = None;
        } else {
            debug!(bytes = body.len(), "요청 본문 수집");
        }
        next.run(ctx).await
    }
}
