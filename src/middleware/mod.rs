//! 요청 하나를 순서대로 처리하는 미들웨어 체인과 기본 미들웨어들

pub mod body;
pub mod chain;
pub mod context;
pub mod error;
pub mod etag;
pub mod forward;
pub mod helper;
pub mod response;
pub mod select;
pub mod static_files;
pub mod throttle;
pub mod traits;

pub use body::BodyCollector;
pub use chain::{Flow, Next, Outcome};
pub use context::{empty_body, full_body, Body, BoxBody, BoxError, Context, ResponseHead};
pub use error::MiddlewareError;
pub use etag::ETag;
pub use forward::{Agent, Forward, ForwardConfig};
pub use helper::ServerHelper;
pub use response::{error_response, handle_middleware_error, not_found};
pub use select::{Capture, PathPattern, Pattern, Select, Selector};
pub use static_files::StaticFiles;
pub use traits::Middleware;
