use std::fmt;

use crate::tunnel::TunnelError;

#[derive(Debug)]
pub enum Error {
    ConfigError(String),
    IoError(std::io::Error),
    Tunnel(TunnelError),
    Hyper(hyper::Error),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<TunnelError> for Error {
    fn from(err: TunnelError) -> Self {
        Error::Tunnel(err)
    }
}

impl From<hyper::Error> for Error {
    fn from(err: hyper::Error) -> Self {
        Error::Hyper(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConfigError(msg) => write!(f, "Config Error: {}", msg),
            Error::IoError(e) => write!(f, "IO Error: {}", e),
            Error::Tunnel(e) => write!(f, "Tunnel Error: {}", e),
            Error::Hyper(e) => write!(f, "HTTP Error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::Tunnel(e) => Some(e),
            Error::Hyper(e) => Some(e),
            Error::ConfigError(_) => None,
        }
    }
}
