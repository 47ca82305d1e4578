//! Multi-object identity tracking and event classification for the
//! passenger-counting pipeline.
//!
//! This crate is pure computation: no threads, no queues, no I/O. It is
//! driven one tick at a time by `boardcount-core`'s tracker worker, which
//! owns the queues and turns [`event_classifier::TickEvent`]s into counter
//! updates and log records.

mod event_classifier;
mod kalman;
mod ordered_map;
mod sort;

pub use event_classifier::{EventClassifier, EventClassifierParams, Emission, TickEvent};
pub use ordered_map::OrderedBoundedMap;
pub use sort::{Sort, SortParams};
