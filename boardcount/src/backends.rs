//! Stand-in implementations of the opaque capability interfaces declared by
//! `boardcount-core` (spec.md §1: the video decoder/encoder, the detector
//! and door-classifier neural networks, and the GPS source are all explicit
//! "out of scope" external collaborators). Wiring a real decoder (RTSP/file),
//! a real inference backend (ONNX Runtime, TorchScript, ...), a real video
//! encoder, and a real GPS source is deployment-specific integration work
//! that does not belong in this crate; these placeholders exist only so the
//! binary links and runs end to end.

use boardcount_core::classifier::Classifier;
use boardcount_core::detector::{Detector, RawBox};
use boardcount_core::gps::GpsProvider;
use boardcount_core::reader::Decoder;
use boardcount_core::writer::VideoSink;
use boardcount_core::{ClassifierFactory, DecoderFactory, DetectorFactory};
use boardcount_types::SessionConfig;

/// Produces an unending stream of blank frames. A real deployment replaces
/// this with a decoder bound to `source` (the `streams[i]` entry from the
/// session config).
struct PlaceholderDecoder {
    width: u32,
    height: u32,
}

impl Decoder for PlaceholderDecoder {
    fn next_frame(&mut self) -> Result<Option<boardcount_core::frame::Frame>, String> {
        std::thread::sleep(std::time::Duration::from_millis(33));
        Ok(Some(boardcount_core::frame::Frame::zeros(
            self.width,
            self.height,
        )))
    }
}

pub fn decoder_factory() -> DecoderFactory {
    Box::new(|_camera, _source| {
        Box::new(PlaceholderDecoder {
            width: 640,
            height: 640,
        }) as Box<dyn Decoder>
    })
}

/// Detects nothing. A real deployment replaces this with a model loaded
/// from `detect_weights`.
struct PlaceholderDetector;

impl Detector for PlaceholderDetector {
    fn detect(&mut self, _frame: &boardcount_core::frame::Frame) -> Result<Vec<RawBox>, String> {
        Ok(Vec::new())
    }
}

pub fn detector_factory(_config: &SessionConfig) -> DetectorFactory {
    Box::new(|| Box::new(PlaceholderDetector) as Box<dyn Detector>)
}

/// Always reports the door closed. A real deployment replaces this with a
/// model loaded from `cls_weights`.
struct PlaceholderClassifier;

impl Classifier for PlaceholderClassifier {
    fn classify(&mut self, _frame: &boardcount_core::frame::Frame) -> Result<f64, String> {
        Ok(1.0)
    }
}

pub fn classifier_factory(_config: &SessionConfig) -> ClassifierFactory {
    Box::new(|| Box::new(PlaceholderClassifier) as Box<dyn Classifier>)
}

/// Discards every frame. A real deployment replaces this with an encoder
/// bound to `fourcc`/`fps`.
struct PlaceholderSink;

impl VideoSink for PlaceholderSink {
    fn write_frame(&mut self, _frame: &boardcount_core::frame::Frame) -> Result<(), String> {
        Ok(())
    }
    fn close(&mut self) -> Result<(), String> {
        Ok(())
    }
}

pub fn sink_factory() -> boardcount_core::writer::SinkFactory {
    std::sync::Arc::new(|_path, _fourcc, _fps| Box::new(PlaceholderSink) as Box<dyn VideoSink>)
}

/// Never produces a fix. A real deployment replaces this with a GPS
/// hardware read or a call to the vendor API keyed by `gps_api_key`.
struct PlaceholderGps;

impl GpsProvider for PlaceholderGps {
    fn poll(&mut self) -> Option<(f64, f64)> {
        None
    }
}

pub fn gps_provider(_config: &SessionConfig) -> Box<dyn GpsProvider> {
    Box::new(PlaceholderGps)
}
