//! Data model shared by the boardcount pipeline crates: session
//! configuration, detections, door state, tracker tag types, the
//! append-only log record schema, and geolocation samples.
//!
//! Grounded on `flydra-types`/`braid-config-data` from the teacher
//! workspace: one crate of small, serde-friendly, I/O-free types that the
//! pipeline and tracker crates both depend on.

mod config;
mod detection;
mod direction;
mod error;
mod geolocation;
mod log;

pub use config::{ClassifierConfig, DetectorConfig, SessionConfig, TrackerConfig};
pub use detection::{BBox, Detection, DoorState};
pub use direction::{Direction, DirectionState, EventName};
pub use error::{Error, Result};
pub use geolocation::GeoPosition;
pub use log::{LogEvent, LogGeolocation, LogRecord};
