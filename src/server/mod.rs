pub mod error;
pub mod handler;
pub mod listener;
pub mod manager;
mod rewind;

pub type Result<T> = std::result::Result<T, Error>;

pub use error::Error;
pub use handler::RequestHandler;
pub use manager::{default_connect_handler, default_flow, ProxyServer};
pub use rewind::Rewind;
