pub mod credentials;

pub use credentials::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Stored credential hash is malformed")]
    MalformedHash,

    #[error("Unsupported credential scheme: {0}")]
    UnsupportedScheme(String),
}
