pub mod atomic_f64;
pub mod classifier;
pub mod clock;
pub mod detector;
pub mod error;
pub mod frame;
pub mod gps;
pub mod latest_slot;
pub mod logger;
pub mod preprocessor;
pub mod reader;
pub mod session;
pub mod stream;
pub mod supervisor;
pub mod tracker;
pub mod writer;

pub use error::{Error, Result};
pub use session::Session;
pub use stream::{Stream, StreamChannels};
pub use supervisor::{
    ClassifierFactory, DecoderFactory, DetectorFactory, Supervisor, SupervisorDeps,
};
