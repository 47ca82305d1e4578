pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can prevent a session from starting or a config file from
/// loading. Per-tick, per-stage failures never surface as `Error` — they
/// become [`crate::LogRecord`]s and stay local to the worker (see
/// `boardcount-core`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("TOML deserialization error: {source}")]
    TomlDe {
        #[from]
        source: toml::de::Error,
    },
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
    #[error("shell variable lookup error: {source}")]
    ShellExpand {
        #[from]
        source: shellexpand::LookupError<std::env::VarError>,
    },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
