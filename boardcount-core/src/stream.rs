use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use boardcount_types::{Detection, DoorState, LogRecord};

use crate::atomic_f64::AtomicF64;
use crate::frame::Frame;
use crate::latest_slot::LatestSlot;

/// Queue capacities for the six non-`raw` queues. `raw` is not a FIFO at
/// all — see [`LatestSlot`] and spec.md §4.1's drop-oldest policy. The
/// others are slightly deeper to absorb jitter between stage ticks without
/// ever dropping (spec.md §5: "Downstream stages never drop").
const STAGE_QUEUE_CAP: usize = 8;
const LOGS_QUEUE_CAP: usize = 256;

/// The seven queues of one Stream (spec.md §3): `raw` is shared as a
/// single-slot mailbox (see [`Stream::raw`]); the rest are consumed exactly
/// once when the Supervisor spawns each stage worker.
pub struct StreamChannels {
    pub detect_in_tx: channellib::Sender<Frame>,
    pub detect_in_rx: channellib::Receiver<Frame>,
    pub cls_in_tx: channellib::Sender<Frame>,
    pub cls_in_rx: channellib::Receiver<Frame>,
    pub write_in_tx: channellib::Sender<Frame>,
    pub write_in_rx: channellib::Receiver<Frame>,
    pub detect_out_tx: channellib::Sender<Detection>,
    pub detect_out_rx: channellib::Receiver<Detection>,
    pub cls_out_tx: channellib::Sender<DoorState>,
    pub cls_out_rx: channellib::Receiver<DoorState>,
    pub logs_tx: channellib::Sender<LogRecord>,
    pub logs_rx: channellib::Receiver<LogRecord>,
}

/// Per-camera pipeline state (spec.md §3's "Stream"). Holds the shared
/// atomic scalars every stage worker may read, and the `raw` mailbox, which
/// is shared directly (an `Arc` clone, not a channel endpoint) so a
/// restarted Reader can resume pushing into the very same slot.
pub struct Stream {
    pub camera: u32,
    pub raw: Arc<LatestSlot<Frame>>,
    count_in: AtomicU64,
    count_out: AtomicU64,
    last_read_timestamp: AtomicF64,
}

impl Stream {
    pub fn new(camera: u32) -> (Self, StreamChannels) {
        let raw = Arc::new(LatestSlot::new());
        let (detect_in_tx, detect_in_rx) = channellib::bounded(STAGE_QUEUE_CAP);
        let (cls_in_tx, cls_in_rx) = channellib::bounded(STAGE_QUEUE_CAP);
        let (write_in_tx, write_in_rx) = channellib::bounded(STAGE_QUEUE_CAP);
        let (detect_out_tx, detect_out_rx) = channellib::bounded(STAGE_QUEUE_CAP);
        let (cls_out_tx, cls_out_rx) = channellib::bounded(STAGE_QUEUE_CAP);
        let (logs_tx, logs_rx) = channellib::bounded(LOGS_QUEUE_CAP);

        let stream = Stream {
            camera,
            raw: raw.clone(),
            count_in: AtomicU64::new(0),
            count_out: AtomicU64::new(0),
            last_read_timestamp: AtomicF64::new(0.0),
        };
        let channels = StreamChannels {
            detect_in_tx,
            detect_in_rx,
            cls_in_tx,
            cls_in_rx,
            write_in_tx,
            write_in_rx,
            detect_out_tx,
            detect_out_rx,
            cls_out_tx,
            cls_out_rx,
            logs_tx,
            logs_rx,
        };
        (stream, channels)
    }

    pub fn count_in(&self) -> u64 {
        self.count_in.load(Ordering::Relaxed)
    }

    pub fn count_out(&self) -> u64 {
        self.count_out.load(Ordering::Relaxed)
    }

    /// `count_in - count_out`, per `original_source/managers/session.py`'s
    /// `count_total` property.
    pub fn count_total(&self) -> i64 {
        self.count_in() as i64 - self.count_out() as i64
    }

    pub fn commit_enter(&self) {
        self.count_in.fetch_add(1, Ordering::Relaxed);
    }

    pub fn commit_exit(&self) {
        self.count_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Clamp-decrement: never goes below zero, per spec.md §3's invariant.
    pub fn cancel_enter(&self) {
        saturating_decrement(&self.count_in);
    }

    pub fn cancel_exit(&self) {
        saturating_decrement(&self.count_out);
    }

    pub fn touch_heartbeat(&self, now: f64) {
        self.last_read_timestamp.store(now, Ordering::Relaxed);
    }

    pub fn last_read_timestamp(&self) -> f64 {
        self.last_read_timestamp.load(Ordering::Relaxed)
    }
}

fn saturating_decrement(counter: &AtomicU64) {
    let _ = counter.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| {
        Some(v.saturating_sub(1))
    });
}
