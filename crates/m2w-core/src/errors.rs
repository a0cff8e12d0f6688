/// Core error type.
///
/// Adapter crates map their specific errors into this type. The resolution
/// pipeline never returns it to callers: each step folds it into a
/// [`crate::location::NoMatch`] reason instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("external error: {0}")]
    External(String),
}

pub type Result<T> = std::result::Result<T, Error>;
