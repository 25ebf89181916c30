use std::sync::Arc;

use tracing::trace;

use super::{Context, Middleware, MiddlewareError};

/// 체인의 나머지 부분
///
/// 값으로 소비되므로 한 미들웨어가 하위 체인을 두 번 실행할 수 없습니다.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    pub(crate) fn new(rest: &'a [Arc<dyn Middleware>]) -> Self {
        Self { rest }
    }

    /// 다음 미들웨어를 실행합니다. 남은 미들웨어가 없으면 아무 일도 하지 않습니다.
    pub async fn run(self, ctx: &mut Context) -> Result<(), MiddlewareError> {
        match self.rest.split_first() {
            Some((current, rest)) => {
                trace!(middleware = current.name(), "미들웨어 실행");
                current.handle(ctx, Next { rest }).await
            }
            None => {
                ctx.mark_exhausted();
                Ok(())
            }
        }
    }

    /// 아직 실행되지 않은 미들웨어 수
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// 체인 실행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Handled,
    /// 끝까지 내려갔지만 본문도 종료도 없음 (기본 404 대상)
    Unhandled,
}

/// 순서가 있는 미들웨어 목록
#[derive(Clone, Default)]
pub struct Flow {
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Flow {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Arc::new(middleware));
    }

    pub fn add_shared(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.add(middleware);
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name()).collect()
    }

    pub async fn run(&self, ctx: &mut Context) -> Result<Outcome, MiddlewareError> {
        Next::new(&self.middlewares).run(ctx).await?;

        if ctx.is_unhandled() {
            Ok(Outcome::Unhandled)
        } else {
            Ok(Outcome::Handled)
        }
    }
}

impl From<Vec<Arc<dyn Middleware>>> for Flow {
    fn from(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self { middlewares }
    }
}

impl std::fmt::Debug for Flow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Flow")
            .field("middlewares", &self.names())
            .finish()
    }
}
