use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_ok::CrossbeamOk;

use boardcount_types::{LogEvent, LogRecord};

use crate::clock::Clock;
use crate::frame::Frame;
use crate::reader::push_log_record;
use crate::stream::Stream;

const EMPTY_QUEUE_SLEEP: Duration = Duration::from_millis(10);

/// Capability interface for an opaque video encoder backend, per spec.md
/// §1's "out of scope: ... the video codec/container implementation". Any
/// backend (`ffmpeg`, a hardware encoder, a no-op sink for headless runs)
/// that can accept frames and be cleanly closed satisfies this.
pub trait VideoSink: Send {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), String>;
    fn close(&mut self) -> Result<(), String>;
}

/// Builds a fresh [`VideoSink`] for a given output path, fourcc, and frame
/// rate. The Supervisor shares one of these across every camera's Writer
/// thread and calls it again on every hourly rotation (spec.md §4.6); `Arc`
/// rather than `Box` so it can be cloned into each camera's worker thread.
pub type SinkFactory = Arc<dyn Fn(&std::path::Path, &str, u32) -> Box<dyn VideoSink> + Send + Sync>;

/// File extension for a given fourcc code, per
/// `original_source/writer.py`'s `FOURCC_TO_EXT` table. An unrecognized
/// fourcc falls back to `.avi`, matching `self._extensions.get(self._fourcc,
/// ".avi")` in the original.
pub fn ext_for_fourcc(fourcc: &str) -> &'static str {
    match fourcc.to_ascii_uppercase().as_str() {
        "XVID" | "MJPG" => ".avi",
        "MP4V" | "X264" => ".mp4",
        _ => ".avi",
    }
}

/// Builds the hour-rotating output path of spec.md §4.6:
/// `{out_dir}/video_{date}_hour{hour}_cam{camera}{ext}`.
pub fn output_path(
    out_dir: &std::path::Path,
    date: chrono::NaiveDate,
    hour: u32,
    camera: u32,
    fourcc: &str,
) -> PathBuf {
    out_dir.join(format!(
        "video_{date}_hour{hour}_cam{camera}{ext}",
        ext = ext_for_fourcc(fourcc)
    ))
}

/// Runs the Writer worker (spec.md §4.6): writes every frame from
/// `write_in_rx` to the current hour's file, opening a new file (and
/// closing the previous one) whenever the wall-clock hour advances.
#[allow(clippy::too_many_arguments)]
pub fn run_writer(
    make_sink: SinkFactory,
    clock: Arc<dyn Clock>,
    out_dir: PathBuf,
    fourcc: String,
    fps: u32,
    stream: Arc<Stream>,
    write_in_rx: channellib::Receiver<Frame>,
    logs_tx: channellib::Sender<LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
    flag: thread_control::Flag,
) {
    let now = clock.now();
    let mut current_hour = now.hour_key();
    let mut path = output_path(&out_dir, now.date_naive(), current_hour, stream.camera, &fourcc);
    let mut sink = make_sink(&path, &fourcc, fps);

    while flag.alive() {
        let now = clock.now();
        let hour = now.hour_key();
        if hour != current_hour {
            let _ = sink.close();
            current_hour = hour;
            path = output_path(&out_dir, now.date_naive(), current_hour, stream.camera, &fourcc);
            sink = make_sink(&path, &fourcc, fps);
        }

        let frame = match write_in_rx.try_recv() {
            Ok(frame) => frame,
            Err(_) => {
                std::thread::sleep(EMPTY_QUEUE_SLEEP);
                continue;
            }
        };

        if let Err(message) = sink.write_frame(&frame) {
            let record = LogRecord::new(
                chrono::Utc::now(),
                stream.camera,
                route_id.clone(),
                bus_id.clone(),
                session_id.clone(),
                LogEvent::WriterWriteError,
                Some(message),
                None,
            );
            push_log_record(&logs_tx, record, &session_id, stream.camera);
        }
    }

    let _ = sink.close();
}

/// `chrono::DateTime`'s hour, paired with its date, used as the rotation
/// key. Keeping this as a trait extension (rather than a free function)
/// reads naturally at both call sites above.
trait HourKey {
    fn hour_key(&self) -> u32;
}

impl HourKey for chrono::DateTime<chrono::Utc> {
    fn hour_key(&self) -> u32 {
        use chrono::Timelike;
        self.hour()
    }
}
