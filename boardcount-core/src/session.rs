use std::sync::atomic::Ordering;
use std::sync::Arc;

use boardcount_types::SessionConfig;

use crate::atomic_f64::AtomicF64;
use crate::stream::{Stream, StreamChannels};

/// Container for all streams and the cross-stream workers (spec.md
/// GLOSSARY). Shared mutable state is limited to the atomic scalars
/// described in spec.md §9; everything else is set once at construction
/// and never mutated.
pub struct Session {
    pub config: SessionConfig,
    pub session_id: String,
    pub streams: Vec<Arc<Stream>>,
    latitude: AtomicF64,
    longitude: AtomicF64,
    gps_timestamp: AtomicF64,
    has_gps_fix: std::sync::atomic::AtomicBool,
}

impl Session {
    /// Builds the Session together with each Stream's [`StreamChannels`],
    /// returned in camera order (1-based, so `channels[0]` is camera 1).
    /// The Supervisor is the sole consumer of the channels: a `Session`
    /// otherwise never reaches into queue internals (spec.md §3: "may be
    /// read concurrently ... never mutates children after construction").
    pub fn new(config: SessionConfig, today: chrono::NaiveDate) -> (Self, Vec<StreamChannels>) {
        let session_id = config.session_id(today);
        let mut streams = Vec::with_capacity(config.n_cameras);
        let mut channels = Vec::with_capacity(config.n_cameras);
        for camera in 1..=config.n_cameras as u32 {
            let (stream, stream_channels) = Stream::new(camera);
            streams.push(Arc::new(stream));
            channels.push(stream_channels);
        }
        let session = Self {
            config,
            session_id,
            streams,
            latitude: AtomicF64::new(0.0),
            longitude: AtomicF64::new(0.0),
            gps_timestamp: AtomicF64::new(0.0),
            has_gps_fix: std::sync::atomic::AtomicBool::new(false),
        };
        (session, channels)
    }

    /// `Σ stream.count_in`, per spec.md §8 invariant 4.
    pub fn count_in(&self) -> u64 {
        self.streams.iter().map(|s| s.count_in()).sum()
    }

    pub fn count_out(&self) -> u64 {
        self.streams.iter().map(|s| s.count_out()).sum()
    }

    /// `count_in - count_out`, per `original_source/managers/session.py`'s
    /// `count_total` property (§11 of SPEC_FULL.md).
    pub fn count_total(&self) -> i64 {
        self.count_in() as i64 - self.count_out() as i64
    }

    /// Publish a fresh GPS fix. Called by the GPS worker only.
    pub fn publish_gps(&self, latitude: f64, longitude: f64, now: f64) {
        self.latitude.store(latitude, Ordering::Relaxed);
        self.longitude.store(longitude, Ordering::Relaxed);
        self.gps_timestamp.store(now, Ordering::Relaxed);
        self.has_gps_fix.store(true, Ordering::Relaxed);
    }

    /// Current position, or `None` if no fix has ever been published or the
    /// last fix is older than `patience` seconds (spec.md §4.8).
    pub fn geolocation(&self, now: f64) -> Option<boardcount_types::GeoPosition> {
        if !self.has_gps_fix.load(Ordering::Relaxed) {
            return None;
        }
        let age = now - self.gps_timestamp.load(Ordering::Relaxed);
        if age > self.config.patience as f64 {
            return None;
        }
        Some(boardcount_types::GeoPosition {
            latitude: self.latitude.load(Ordering::Relaxed),
            longitude: self.longitude.load(Ordering::Relaxed),
        })
    }
}
