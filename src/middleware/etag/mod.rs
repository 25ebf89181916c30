mod hash;

pub use hash::{jhash, BodyHasher, JHash};

use async_trait::async_trait;
use hyper::header::{HeaderValue, ETAG, IF_NONE_MATCH};
use hyper::StatusCode;
use tracing::debug;

use super::{Body, Context, Middleware, MiddlewareError, Next};

/// 하위 체인이 만든 바이트 본문에 ETag를 붙이고 조건부 요청이면 304로 응답합니다.
///
/// 빈 본문과 스트림 본문은 건드리지 않습니다.
pub struct ETag<H = JHash> {
    hasher: H,
}

impl ETag {
    pub fn new() -> Self {
        Self { hasher: JHash }
    }
}

impl Default for ETag {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: BodyHasher> ETag<H> {
    pub fn with_hasher(hasher: H) -> Self {
        Self { hasher }
    }
}

/// `W/"123"` 같은 표기에서 숫자만 꺼냅니다.
fn parse_if_none_match(value: &str) -> Option<u64> {
    value.trim()
        .trim_start_matches("W/")
        .trim_matches('"')
        .parse()
        .ok()
}

#[async_trait]
impl<H: BodyHasher> Middleware for ETag<H> {
    fn name(&self) -> &str {
        "etag"
    }

    async fn handle(&self, ctx: &mut Context, next: Next<'_>) -> Result<(), MiddlewareError> {
        next.run(ctx).await?;

        if ctx.res.is_finished() {
            return Ok(());
        }
        let hash = match &ctx.body {
            Body::Bytes(data) => self.hasher.hash(data),
            Body::Empty | Body::Stream(_) => return Ok(()),
        };

        let cached = ctx.req.headers()
            .get(IF_NONE_MATCH)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_if_none_match);

        if cached == Some(hash) {
            debug!(etag = hash, "캐시 일치, 304 응답");
            ctx.res.status = StatusCode::NOT_MODIFIED;
            ctx.end();
            return Ok(());
        }

        ctx.res.headers.insert(ETAG, HeaderValue::from(hash));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_if_none_match() {
        assert_eq!(parse_if_none_match("123"), Some(123));
        assert_eq!(parse_if_none_match("\"123\""), Some(123));
        assert_eq!(parse_if_none_match("W/\"123\""), Some(123));
        assert_eq!(parse_if_none_match("abc"), None);
    }
}
