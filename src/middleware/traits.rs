use async_trait::async_trait;

use super::{Context, MiddlewareError, Next};

/// 미들웨어 트레이트
///
/// 컨텍스트를 읽고 수정한 뒤 `next`를 실행할지, 여기서 응답을 확정할지 결정합니다.
/// `next.run(ctx).await` 이후의 코드는 하위 미들웨어가 모두 끝난 뒤에 실행됩니다.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// 미들웨어의 고유 이름을 반환합니다.
    fn name(&self) -> &str;

    /// 요청을 처리합니다.
    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), MiddlewareError>;
}
