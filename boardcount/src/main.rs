#[macro_use]
extern crate log;

use anyhow::{Context, Result};
use clap::Parser;

use boardcount_core::{Supervisor, SupervisorDeps};
use boardcount_types::SessionConfig;

mod backends;

/// Counts boarding passengers from a set of camera streams for one bus
/// route, running until the configured `stop_hour` arrives.
#[derive(Debug, Parser)]
#[command(author, version, about)]
struct BoardcountCliArgs {
    /// Path to the session's TOML configuration file.
    config_file: std::path::PathBuf,
}

fn main() -> Result<()> {
    let _log_tracer = tracing_log::LogTracer::init();
    let _logging_guard = env_tracing_logger::init();

    let args = BoardcountCliArgs::parse();
    debug!("{:?}", args);

    let mut config = SessionConfig::from_toml_file(&args.config_file)
        .with_context(|| format!("reading config file \"{}\"", args.config_file.display()))?;
    config.resolve_gps_api_key();
    config
        .validate()
        .context("validating session configuration")?;
    debug!("{:?}", config);

    let today = chrono::Local::now().date_naive();
    let (session, channels) = boardcount_core::Session::new(config, today);
    info!("starting session \"{}\"", session.session_id);

    let deps = SupervisorDeps {
        decoder_factory: backends::decoder_factory(),
        detector_factory: backends::detector_factory(&session.config),
        classifier_factory: backends::classifier_factory(&session.config),
        sink_factory: backends::sink_factory(),
        gps_provider: backends::gps_provider(&session.config),
    };

    let supervisor = Supervisor::start(session, channels, deps);
    supervisor.run();

    debug!("done {}:{}", file!(), line!());
    Ok(())
}
