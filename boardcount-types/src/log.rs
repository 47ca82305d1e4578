use serde::{Deserialize, Serialize};

use crate::geolocation::GeoPosition;

/// Names of every event a worker can emit to the `logs` queue.
///
/// The commit/cancel events (`Enter`/`Exit`/`CancelEnter`/`CancelExit`) are
/// produced by the tracker's event-classification state machine
/// (spec.md §4.5); the `*Error` variants are the concrete transient-I/O
/// log events of spec.md §7, named after
/// `examples/original_source/`'s `{stage}_put_error` / `reader_error`
/// convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEvent {
    Enter,
    Exit,
    CancelEnter,
    CancelExit,
    ReaderError,
    ReaderPutError,
    PreprocessorPutError,
    DetectorPutError,
    ClassifierPutError,
    TrackerPutError,
    WriterWriteError,
    LoggerWriteError,
}

impl LogEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            LogEvent::Enter => "enter",
            LogEvent::Exit => "exit",
            LogEvent::CancelEnter => "cancel_enter",
            LogEvent::CancelExit => "cancel_exit",
            LogEvent::ReaderError => "reader_error",
            LogEvent::ReaderPutError => "reader_put_error",
            LogEvent::PreprocessorPutError => "preprocessor_put_error",
            LogEvent::DetectorPutError => "detector_put_error",
            LogEvent::ClassifierPutError => "classifier_put_error",
            LogEvent::TrackerPutError => "tracker_put_error",
            LogEvent::WriterWriteError => "writer_write_error",
            LogEvent::LoggerWriteError => "logger_write_error",
        }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One append-only log record, matching the schema of spec.md §3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Wall-clock timestamp, seconds since 1970-01-01.
    pub timestamp: f64,
    pub date: String,
    pub time: String,
    pub camera: u32,
    pub route_id: String,
    pub bus_id: String,
    pub session_id: String,
    pub event: String,
    pub error: Option<String>,
    pub geolocation: LogGeolocation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogGeolocation {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl From<Option<GeoPosition>> for LogGeolocation {
    fn from(pos: Option<GeoPosition>) -> Self {
        match pos {
            Some(p) => LogGeolocation {
                latitude: Some(p.latitude),
                longitude: Some(p.longitude),
            },
            None => LogGeolocation {
                latitude: None,
                longitude: None,
            },
        }
    }
}

impl LogRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        now: chrono::DateTime<chrono::Utc>,
        camera: u32,
        route_id: impl Into<String>,
        bus_id: impl Into<String>,
        session_id: impl Into<String>,
        event: LogEvent,
        error: Option<String>,
        geolocation: Option<GeoPosition>,
    ) -> Self {
        Self {
            timestamp: now.timestamp() as f64 + (now.timestamp_subsec_nanos() as f64 / 1e9),
            date: now.format("%Y-%m-%d").to_string(),
            time: now.format("%H:%M:%S%.6f").to_string(),
            camera,
            route_id: route_id.into(),
            bus_id: bus_id.into(),
            session_id: session_id.into(),
            event: event.as_str().to_string(),
            error,
            geolocation: geolocation.into(),
        }
    }

    pub fn to_json_string(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
