//! 요청 셀렉터와 조건부 미들웨어 디스패치

mod path;
mod pattern;
mod selector;

pub use path::{PathPattern, PathPatternError};
pub use pattern::{Capture, Pattern, Predicate};
pub use selector::{Captures, Selector};

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::trace;

use super::{Body, Context, Middleware, MiddlewareError, Next};

/// 셀렉터가 일치할 때만 대상 미들웨어를 실행하고, 아니면 다음으로 넘깁니다.
pub struct Select {
    selector: Selector,
    target: Arc<dyn Middleware>,
}

impl Select {
    pub fn new<M: Middleware + 'static>(selector: impl Into<Selector>, middleware: M) -> Self {
        Self::shared(selector, Arc::new(middleware))
    }

    pub fn shared(selector: impl Into<Selector>, middleware: Arc<dyn Middleware>) -> Self {
        Self {
            selector: selector.into(),
            target: middleware,
        }
    }

    /// 일치하면 고정 본문으로 응답합니다.
    pub fn body(selector: impl Into<Selector>, body: impl Into<Bytes>) -> Self {
        Self::new(selector, FixedBody::new(body))
    }
}

#[async_trait]
impl Middleware for Select {
    fn name(&self) -> &str {
        "select"
    }

    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), MiddlewareError> {
        match self.selector.matches_request(&ctx.req) {
            Some(captures) => {
                trace!(target_middleware = self.target.name(), "셀렉터 일치");
                captures.apply(ctx);
                self.target.handle(ctx, next).await
            }
            None => next.run(ctx).await,
        }
    }
}

/// 항상 같은 본문으로 응답하는 종단 미들웨어
#[derive(Debug, Clone)]
pub struct FixedBody {
    body: Bytes,
}

impl FixedBody {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self { body: body.into() }
    }
}

#[async_trait]
impl Middleware for FixedBody {
    fn name(&self) -> &str {
        "fixed-body"
    }

    async fn handle(&self, ctx: &mut Context, _next: Next<'_>) -> Result<(), MiddlewareError> {
        ctx.body = Body::Bytes(self.body.clone());
        Ok(())
    }
}
