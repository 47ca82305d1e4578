use std::io;

/// Errors raised by the pipeline crate's own bookkeeping, e.g. log file
/// I/O. Per spec.md §7, errors that occur *inside* a running stage never
/// surface through this type — they become [`boardcount_types::LogRecord`]s
/// and the stage continues. This type is for the paths that bracket a
/// stage's tick loop instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
