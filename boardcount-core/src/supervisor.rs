use std::sync::Arc;
use std::time::Duration;

use boardcount_types::LogRecord;

use crate::classifier::{run_classifier, Classifier};
use crate::clock::{now_unix_seconds, Clock, SystemClock};
use crate::detector::{run_detector, Detector};
use crate::gps::{run_gps, GpsProvider};
use crate::logger::run_logger;
use crate::preprocessor::run_preprocessor;
use crate::reader::{run_reader, Decoder};
use crate::session::Session;
use crate::stream::{Stream, StreamChannels};
use crate::tracker::{run_tracker, TrackerParams};
use crate::writer::{run_writer, SinkFactory};

const INSPECTION_INTERVAL: Duration = Duration::from_secs(1);

/// Builds the [`Decoder`] for one camera, given its 1-based camera index
/// and the `streams[i]` source string from [`boardcount_types::SessionConfig`].
/// Called once at startup per camera and again every time the Supervisor
/// restarts a stalled Reader (spec.md §4.9).
pub type DecoderFactory = Box<dyn Fn(u32, &str) -> Box<dyn Decoder> + Send>;
pub type DetectorFactory = Box<dyn Fn() -> Box<dyn Detector> + Send>;
pub type ClassifierFactory = Box<dyn Fn() -> Box<dyn Classifier> + Send>;

/// Everything the Supervisor needs to stand up a full session's workers.
/// The opaque capability factories correspond exactly to spec.md §1's list
/// of external collaborators: a video decoder, a detector model, a door
/// classifier model, a video encoder, and a GPS source.
pub struct SupervisorDeps {
    pub decoder_factory: DecoderFactory,
    pub detector_factory: DetectorFactory,
    pub classifier_factory: ClassifierFactory,
    pub sink_factory: SinkFactory,
    pub gps_provider: Box<dyn GpsProvider>,
}

type WorkerHandle = (thread_control::Control, std::thread::JoinHandle<()>);

struct ReaderHandle {
    control: thread_control::Control,
    join: std::thread::JoinHandle<()>,
}

/// Per-camera bookkeeping. `source`/`logs_tx` are kept around so the
/// inspection loop can rebuild a fresh Reader without needing anything
/// beyond what's already on the Supervisor.
struct CameraWorkers {
    reader: ReaderHandle,
    others: Vec<WorkerHandle>,
    source: String,
    logs_tx: channellib::Sender<LogRecord>,
}

/// Orchestrates one full session: spawns the per-camera pipeline (Reader,
/// Preprocessor, Detector, Classifier, Tracker, Writer) plus the
/// session-level Logger and GPS workers, then runs a 1s inspection loop
/// that restarts a stalled Reader and tears everything down once the
/// configured stop hour arrives (spec.md §4.9).
pub struct Supervisor {
    session: Arc<Session>,
    clock: Arc<dyn Clock>,
    cameras: Vec<CameraWorkers>,
    session_workers: Vec<WorkerHandle>,
    decoder_factory: DecoderFactory,
}

impl Supervisor {
    /// Spawns every worker for `session` and returns a running Supervisor.
    /// `channels` must be the `Vec<StreamChannels>` returned alongside
    /// `session` by [`Session::new`], in the same camera order.
    pub fn start(session: Session, channels: Vec<StreamChannels>, deps: SupervisorDeps) -> Self {
        Self::start_with_clock(session, channels, deps, Arc::new(SystemClock))
    }

    pub fn start_with_clock(
        session: Session,
        channels: Vec<StreamChannels>,
        deps: SupervisorDeps,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let session = Arc::new(session);
        let route_id = session.config.route_id.clone();
        let bus_id = session.config.bus_id.clone();
        let session_id = session.session_id.clone();
        let tracker_params = TrackerParams::from_config(&session.config);

        let SupervisorDeps {
            decoder_factory,
            detector_factory,
            classifier_factory,
            sink_factory,
            gps_provider,
        } = deps;

        let mut cameras = Vec::with_capacity(session.streams.len());
        let mut logs_rxs = Vec::with_capacity(session.streams.len());

        for (idx, stream_channels) in channels.into_iter().enumerate() {
            let stream = session.streams[idx].clone();
            let source = session.config.streams[idx].clone();
            logs_rxs.push(stream_channels.logs_rx);

            let reader_logs_tx = stream_channels.logs_tx.clone();
            let reader = spawn_reader(
                decoder_factory.as_ref(),
                &source,
                stream.clone(),
                reader_logs_tx.clone(),
                session_id.clone(),
                route_id.clone(),
                bus_id.clone(),
            );

            let mut others = Vec::with_capacity(5);

            others.push({
                let (flag, control) = thread_control::make_pair();
                let stream = stream.clone();
                let logs_tx = stream_channels.logs_tx.clone();
                let (session_id, route_id, bus_id) =
                    (session_id.clone(), route_id.clone(), bus_id.clone());
                let detect_in_tx = stream_channels.detect_in_tx.clone();
                let cls_in_tx = stream_channels.cls_in_tx.clone();
                let write_in_tx = stream_channels.write_in_tx.clone();
                let width = session.config.width;
                let height = session.config.height;
                let (cls_w, cls_h) = session.config.classifier.cls_shape;
                let join = std::thread::spawn(move || {
                    run_preprocessor(
                        stream, width, height, cls_w, cls_h, detect_in_tx, cls_in_tx,
                        write_in_tx, logs_tx, session_id, route_id, bus_id, flag,
                    )
                });
                (control, join)
            });

            others.push({
                let (flag, control) = thread_control::make_pair();
                let detector = detector_factory();
                let stream = stream.clone();
                let config = session.config.detector.clone();
                let logs_tx = stream_channels.logs_tx.clone();
                let (session_id, route_id, bus_id) =
                    (session_id.clone(), route_id.clone(), bus_id.clone());
                let detect_in_rx = stream_channels.detect_in_rx;
                let detect_out_tx = stream_channels.detect_out_tx.clone();
                let join = std::thread::spawn(move || {
                    run_detector(
                        detector, config, stream, detect_in_rx, detect_out_tx, logs_tx,
                        session_id, route_id, bus_id, flag,
                    )
                });
                (control, join)
            });

            others.push({
                let (flag, control) = thread_control::make_pair();
                let classifier = classifier_factory();
                let stream = stream.clone();
                let config = session.config.classifier.clone();
                let logs_tx = stream_channels.logs_tx.clone();
                let (session_id, route_id, bus_id) =
                    (session_id.clone(), route_id.clone(), bus_id.clone());
                let cls_in_rx = stream_channels.cls_in_rx;
                let cls_out_tx = stream_channels.cls_out_tx.clone();
                let join = std::thread::spawn(move || {
                    run_classifier(
                        classifier, config, stream, cls_in_rx, cls_out_tx, logs_tx,
                        session_id, route_id, bus_id, flag,
                    )
                });
                (control, join)
            });

            others.push({
                let (flag, control) = thread_control::make_pair();
                let stream = stream.clone();
                let session_arc = session.clone();
                let logs_tx = stream_channels.logs_tx.clone();
                let (session_id, route_id, bus_id) =
                    (session_id.clone(), route_id.clone(), bus_id.clone());
                let detect_out_rx = stream_channels.detect_out_rx;
                let cls_out_rx = stream_channels.cls_out_rx;
                let join = std::thread::spawn(move || {
                    run_tracker(
                        tracker_params, stream, session_arc, detect_out_rx, cls_out_rx, logs_tx,
                        session_id, route_id, bus_id, flag,
                    )
                });
                (control, join)
            });

            others.push({
                let (flag, control) = thread_control::make_pair();
                let stream = stream.clone();
                let make_sink = sink_factory.clone();
                let writer_clock = clock.clone();
                let out_dir = session.config.out_video_dir.clone();
                let fourcc = session.config.fourcc.clone();
                let fps = session.config.fps;
                let logs_tx = stream_channels.logs_tx.clone();
                let (session_id, route_id, bus_id) =
                    (session_id.clone(), route_id.clone(), bus_id.clone());
                let write_in_rx = stream_channels.write_in_rx;
                let join = std::thread::spawn(move || {
                    run_writer(
                        make_sink, writer_clock, out_dir, fourcc, fps, stream, write_in_rx,
                        logs_tx, session_id, route_id, bus_id, flag,
                    )
                });
                (control, join)
            });

            cameras.push(CameraWorkers {
                reader,
                others,
                source,
                logs_tx: reader_logs_tx,
            });
        }

        let mut session_workers = Vec::with_capacity(2);

        session_workers.push({
            let (flag, control) = thread_control::make_pair();
            let logs_dir = session.config.logs_dir.clone();
            let session_id = session_id.clone();
            let join = std::thread::spawn(move || run_logger(logs_rxs, logs_dir, session_id, flag));
            (control, join)
        });

        session_workers.push({
            let (flag, control) = thread_control::make_pair();
            let session_arc = session.clone();
            let join = std::thread::spawn(move || run_gps(gps_provider, session_arc, flag));
            (control, join)
        });

        Self {
            session,
            clock,
            cameras,
            session_workers,
            decoder_factory,
        }
    }

    /// Blocks on the 1s inspection loop (spec.md §4.9) until `stop_hour`
    /// arrives, restarting any Reader whose `last_read_timestamp` has gone
    /// stale past `patience` seconds, then stops and joins every worker.
    pub fn run(mut self) {
        let patience = self.session.config.patience as f64;
        let stop_hour = self.session.config.stop_hour;
        let ids = (
            self.session.session_id.clone(),
            self.session.config.route_id.clone(),
            self.session.config.bus_id.clone(),
        );
        let streams = self.session.streams.clone();

        loop {
            std::thread::sleep(INSPECTION_INTERVAL);

            if self.clock.now().hour_matches(stop_hour) {
                break;
            }

            let now = now_unix_seconds();
            for (idx, camera) in self.cameras.iter_mut().enumerate() {
                let stream = streams[idx].clone();
                if now - stream.last_read_timestamp() > patience {
                    restart_reader(camera, self.decoder_factory.as_ref(), stream, &ids);
                }
            }

            tracing::debug!(
                count_in = self.session.count_in(),
                count_out = self.session.count_out(),
                count_total = self.session.count_total(),
                "supervisor heartbeat"
            );
        }

        self.shutdown();
    }

    fn shutdown(self) {
        for camera in &self.cameras {
            camera.reader.control.stop();
        }
        for camera in self.cameras {
            let _ = camera.reader.join.join();
            for (control, join) in camera.others {
                control.stop();
                let _ = join.join();
            }
        }
        for (control, join) in self.session_workers {
            control.stop();
            let _ = join.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_reader(
    decoder_factory: &(dyn Fn(u32, &str) -> Box<dyn Decoder> + Send),
    source: &str,
    stream: Arc<Stream>,
    logs_tx: channellib::Sender<LogRecord>,
    session_id: String,
    route_id: String,
    bus_id: String,
) -> ReaderHandle {
    let decoder = decoder_factory(stream.camera, source);
    let (flag, control) = thread_control::make_pair();
    let join = std::thread::spawn(move || {
        run_reader(decoder, stream, logs_tx, session_id, route_id, bus_id, flag)
    });
    ReaderHandle { control, join }
}

fn restart_reader(
    camera: &mut CameraWorkers,
    decoder_factory: &(dyn Fn(u32, &str) -> Box<dyn Decoder> + Send),
    stream: Arc<Stream>,
    (session_id, route_id, bus_id): &(String, String, String),
) {
    let fresh = spawn_reader(
        decoder_factory,
        &camera.source,
        stream,
        camera.logs_tx.clone(),
        session_id.clone(),
        route_id.clone(),
        bus_id.clone(),
    );
    let stale = std::mem::replace(&mut camera.reader, fresh);
    stale.control.stop();
    let _ = stale.join.join();
}

trait HourMatch {
    fn hour_matches(&self, hour: u32) -> bool;
}

impl HourMatch for chrono::DateTime<chrono::Utc> {
    fn hour_matches(&self, hour: u32) -> bool {
        use chrono::Timelike;
        self.hour() == hour
    }
}
