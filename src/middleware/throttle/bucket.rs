use tokio::time::{Duration, Instant};

/// 바이트 단위 토큰 버킷
///
/// 보충 속도는 호출할 때마다 받습니다. 전역 대역폭 모드에서는 활성 연결 수에 따라
/// 속도가 계속 바뀌기 때문입니다.
#[derive(Debug)]
pub struct TokenBucket {
    /// 현재 사용 가능한 토큰 수 (음수면 빚)
    tokens: f64,
    /// 마지막 업데이트 시간
    last_update: Instant,
}

impl TokenBucket {
    pub fn new() -> Self {
        Self {
            tokens: 0.0,
            last_update: Instant::now(),
        }
    }

    /// `amount` 바이트를 소비하고, 속도를 맞추기 위해 기다려야 할 시간을 반환합니다.
    ///
    /// 용량은 1초 분량(`rate`)으로 제한합니다.
    pub fn consume(&mut self, amount: usize, rate: f64) -> Duration {
        if rate <= 0.0 {
            return Duration::ZERO;
        }

        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);

        // 토큰 보충
        self.tokens = (self.tokens + elapsed.as_secs_f64() * rate).min(rate);
        self.last_update = now;

        self.tokens -= amount as f64;
        if self.tokens >= 0.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(-self.tokens / rate)
        }
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_debt_becomes_wait_time() {
        let mut bucket = TokenBucket::new();
        let wait = bucket.consume(500, 1000.0);
        assert_eq!(wait, Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_over_time() {
        let mut bucket = TokenBucket::new();
        bucket.consume(1000, 1000.0);
        tokio::time::advance(Duration::from_secs(2)).await;

        // 1초 빚을 갚고 1초 분량이 남지만 용량 상한(1000)으로 잘림
        assert_eq!(bucket.consume(1000, 1000.0), Duration::ZERO);
        assert!(bucket.consume(1, 1000.0) > Duration::ZERO);
    }
}
