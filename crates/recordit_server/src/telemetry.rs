//! Tracing setup: stderr always, plus `<log_dir>/recordit.log` when a log
//! directory is available.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const LOG_FILE: &str = "recordit.log";
const DEFAULT_FILTER: &str = "info,recordit_server=debug";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into())
}

/// Install the global subscriber. A log file that cannot be opened is
/// reported on stderr and skipped.
pub fn init(log_dir: Option<&Path>) {
    let file_layer = log_dir.and_then(|dir| {
        let opened = fs::create_dir_all(dir).and_then(|_| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(LOG_FILE))
        });
        match opened {
            Ok(file) => Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .with_filter(env_filter()),
            ),
            Err(e) => {
                eprintln!("cannot open log file in {}: {e}", dir.display());
                None
            }
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_filter(env_filter()))
        .with(file_layer)
        .init();
}
