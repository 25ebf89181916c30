//! 응답 본문 대역폭 제한

mod body;
mod bucket;
mod tracker;

pub use body::Throttled;
pub use bucket::TokenBucket;
pub use tracker::{ConnectionGuard, ConnectionTracker};

/// 본문 하나에 적용할 속도
#[derive(Debug, Clone)]
pub enum ThrottleRate {
    /// 연결마다 고정 bps
    Fixed(u64),
    /// 전체 bps를 활성 연결 수로 나눠 씀
    Shared {
        bps: u64,
        tracker: ConnectionTracker,
    },
}

impl ThrottleRate {
    /// 지금 이 순간의 초당 바이트 수
    pub fn current(&self) -> f64 {
        match self {
            ThrottleRate::Fixed(bps) => *bps as f64,
            // 호출한 본문의 가드도 이미 열려 있으므로 active = 다른 연결 수 + 1
            ThrottleRate::Shared { bps, tracker } => *bps as f64 / tracker.active().max(1) as f64,
        }
    }
}
