use thiserror::Error;

/// The crate-wide error taxonomy (spec §7): configuration, I/O,
/// corruption, and domain (out-of-window get/set) failures.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid archive spec: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("file is corrupted: {0}")]
    Corrupt(String),

    #[error(
        "no suitable archive for timestamp {timestamp} (now={now}, max_retention={max_retention}s)"
    )]
    OutOfRange {
        timestamp: u64,
        now: u64,
        max_retention: u64,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
