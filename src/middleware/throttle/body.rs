use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use hyper::body::{Body, Frame, SizeHint};
use tokio::time::{sleep, Sleep};

use super::{ThrottleRate, TokenBucket};
use crate::middleware::{BoxBody, BoxError};

/// 한 번에 내보내는 조각 크기: 초당 속도의 1/10
fn slice_size(rate: f64) -> usize {
    ((rate / 10.0) as usize).max(1)
}

/// 본문 데이터를 설정된 속도로 흘려보내는 래퍼
///
/// 큰 청크는 잘게 나눠 보내고, 각 조각 뒤에 빚진 만큼 잠듭니다.
pub struct Throttled {
    inner: BoxBody,
    rate: ThrottleRate,
    bucket: TokenBucket,
    delay: Option<Pin<Box<Sleep>>>,
    remainder: Option<Bytes>,
}

impl Throttled {
    pub fn new(inner: BoxBody, rate: ThrottleRate) -> Self {
        Self {
            inner,
            rate,
            bucket: TokenBucket::new(),
            delay: None,
            remainder: None,
        }
    }

    fn emit(&mut self, mut data: Bytes) -> Frame<Bytes> {
        let rate = self.rate.current();
        let size = slice_size(rate);
        if data.len() > size {
            self.remainder = Some(data.split_off(size));
        }

        let wait = self.bucket.consume(data.len(), rate);
        if !wait.is_zero() {
            self.delay = Some(Box::pin(sleep(wait)));
        }
        Frame::data(data)
    }
}

impl Body for Throttled {
    type Data = Bytes;
    type Error = BoxError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if let Some(delay) = this.delay.as_mut() {
            ready!(delay.as_mut().poll(cx));
            this.delay = None;
        }

        if let Some(rest) = this.remainder.take() {
            return Poll::Ready(Some(Ok(this.emit(rest))));
        }

        match ready!(Pin::new(&mut this.inner).poll_frame(cx)) {
            Some(Ok(frame)) => match frame.into_data() {
                Ok(data) => Poll::Ready(Some(Ok(this.emit(data)))),
                Err(frame) => Poll::Ready(Some(Ok(frame))),
            },
            other => Poll::Ready(other),
        }
    }

    fn is_end_stream(&self) -> bool {
        self.remainder.is_none() && self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        let mut hint = self.inner.size_hint();
        if let Some(rest) = &self.remainder {
            let extra = rest.len() as u64;
            // 상한을 먼저 올려야 set_lower가 상한을 넘지 않음
            if let Some(upper) = hint.upper() {
                hint.set_upper(upper + extra);
            }
            hint.set_lower(hint.lower() + extra);
        }
        hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::full_body;
    use http_body_util::BodyExt;
    use tokio::time::{Duration, Instant};

    #[tokio::test(start_paused = true)]
    async fn test_throttled_body_respects_rate() {
        let start = Instant::now();
        let body = Throttled::new(full_body(vec![7u8; 3000]), ThrottleRate::Fixed(1000));

        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(collected.len(), 3000);
        // 마지막 조각 뒤의 대기까지 포함해 약 3초
        assert!(start.elapsed() >= Duration::from_millis(2900));
    }

    #[tokio::test(start_paused = true)]
    async fn test_splits_large_chunks() {
        let mut body = Throttled::new(full_body(vec![1u8; 250]), ThrottleRate::Fixed(1000));
        let first = body.frame().await.unwrap().unwrap().into_data().unwrap();
        assert_eq!(first.len(), 100);
    }
}
