use std::sync::Arc;
use std::time::Duration;

use crossbeam_ok::CrossbeamOk;
use log::warn;

use boardcount_types::{LogEvent, LogRecord};

use crate::clock::now_unix_seconds;
use crate::frame::Frame;
use crate::stream::Stream;

/// Capability interface `(source) -> frame | end-of-stream`, per spec.md
/// §1's "video decoder (opaque 'next frame' iterator)". Any file, URL, or
/// RTSP backend that can honor this contract is acceptable; `boardcount-core`
/// never constructs one itself.
pub trait Decoder: Send {
    /// Decode and return the next frame, `Ok(None)` at end of stream, or
    /// `Err` on a recoverable decode glitch (spec.md §4.1's `failed` state
    /// is reached only when the Supervisor decides to restart, not by this
    /// trait — a transient `Err` here just logs and continues).
    fn next_frame(&mut self) -> Result<Option<Frame>, String>;
}

/// Runs one Reader's `{opened → decoding → {decoding|end|failed}}` loop
/// (spec.md §4.1) until `flag` is cleared by the Supervisor (stop) or the
/// decoder signals end-of-stream.
pub fn run_reader(
    mut decoder: Box<dyn Decoder>,
    stream: Arc<Stream>,
    logs_tx: channellib::Sender<LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
    flag: thread_control::Flag,
) {
    while flag.alive() {
        match decoder.next_frame() {
            Ok(Some(frame)) => {
                stream.raw.push(frame);
                stream.touch_heartbeat(now_unix_seconds());
            }
            Ok(None) => {
                // End of stream: this Reader instance is done. The
                // Supervisor only restarts a Reader on heartbeat staleness,
                // so a clean end-of-stream simply idles until stop.
                break;
            }
            Err(message) => {
                let record = LogRecord::new(
                    chrono::Utc::now(),
                    stream.camera,
                    route_id.clone(),
                    bus_id.clone(),
                    session_id.clone(),
                    LogEvent::ReaderError,
                    Some(message),
                    None,
                );
                push_log_record(&logs_tx, record, &session_id, stream.camera);
            }
        }
    }
}

/// Best-effort log push: retry once, then drop, per spec.md §4.5's failure
/// mode (applied uniformly to every stage's log emission, not just the
/// Tracker's, matching `original_source`'s repeated try/except-around-put
/// shape described in SPEC_FULL.md §11).
pub(crate) fn push_log_record(
    logs_tx: &channellib::Sender<LogRecord>,
    record: LogRecord,
    session_id: &str,
    camera: u32,
) {
    if logs_tx.send(record.clone()).cb_ok().is_none() {
        if logs_tx.send(record).cb_ok().is_none() {
            warn!(
                "dropping log record for session {session_id} camera {camera}: logs queue unavailable"
            );
        }
    }
}
