//! Structured logging initialisation, lifted from the teacher's
//! `logging::console::init_logging` unchanged.

use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .compact()
        .init();
}
