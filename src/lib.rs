//! Intercept Proxy는 개발용 HTTP 가로채기 프록시입니다.
//!
//! 요청마다 미들웨어 체인을 실행해 응답을 만들고, CONNECT 요청은 터널로 넘깁니다.
//!
//! # 주요 기능
//!
//! - 셀렉터 기반 조건부 미들웨어 (`method`, `url`, 헤더)
//! - 업스트림 포워딩과 요청/응답 가공 훅, 대역폭 제한
//! - ETag/304 처리, 정적 파일, SSE 라이브 리로드
//! - CONNECT 직접 터널과 길이 접두 프레임 세션
//!
//! # 예제
//!
//! ```
//! use intercept_proxy::middleware::{Agent, ETag, Flow, Forward, ForwardConfig, Select};
//!
//! let mut flow = Flow::new();
//! flow.add(ETag::new());
//! flow.add(Select::body("/health", "ok"));
//! flow.add(Forward::new(ForwardConfig::new(Agent::new()).target("backend.local:8080")));
//!
//! assert_eq!(flow.names(), vec!["etag", "select", "forward"]);
//! ```
//!
//! # 프레임 코덱
//!
//! ```
//! use intercept_proxy::frame::{self, FrameDecoder};
//!
//! let mut decoder = FrameDecoder::new();
//! let encoded = frame::encode(b"hello").unwrap();
//!
//! assert!(decoder.feed(&encoded[..3]).unwrap().is_empty());
//! assert_eq!(decoder.feed(&encoded[3..]).unwrap(), vec![bytes::Bytes::from("hello")]);
//! ```

pub mod frame;
pub mod logging;
pub mod middleware;
pub mod server;
pub mod settings;
pub mod tunnel;
