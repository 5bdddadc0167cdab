//! Provide tracing, tailored to this crate.
//!
//! The library only emits events. Programs built on it call one of the
//! init_* functions at startup to install a subscriber.
//!
//! Modules include `use crate::tracing::prelude::*` for the `trace!()`,
//! `debug!()`, `info!()`, `warn!()` and `error!()` macros.

use std::env;
use time::OffsetDateTime;
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    fmt::{format::Writer, time::FormatTime},
    prelude::*,
};

pub mod prelude {
    #[allow(unused_imports)]
    pub use tracing::{debug, error, info, trace, warn};
}

use prelude::*;

/// Initialize logging.
///
/// Under systemd, use journald; otherwise log to stderr, leaving stdout
/// for data read off the bus.
pub fn init_journald_or_stderr(default_level: LevelFilter) {
    if env::var("JOURNAL_STREAM").is_ok() {
        if let Ok(layer) = tracing_journald::layer() {
            tracing_subscriber::registry().with(layer).init();
        } else {
            init_stderr(default_level);
            error!("Failed to initialize journald logging, using stderr.");
        }
    } else {
        init_stderr(default_level);
    }
}

/// Log to stderr, filtering according to RUST_LOG, with `default_level`
/// when RUST_LOG does not say otherwise.
pub fn init_stderr(default_level: LevelFilter) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .with_env_var("RUST_LOG")
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_timer(LocalTimer),
        )
        .init();
}

/// Map a `-v` count to a default level: warnings, then info, debug, trace.
pub fn level_for_verbosity(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

// Local-time timestamps to the millisecond; bus timing questions need more
// than whole seconds.
struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = OffsetDateTime::now_local().unwrap_or(OffsetDateTime::now_utc());
        let stamp = now
            .format(time::macros::format_description!(
                "[hour]:[minute]:[second].[subsecond digits:3]"
            ))
            .map_err(|_| std::fmt::Error)?;
        write!(w, "{}", stamp)
    }
}
