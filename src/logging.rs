//! Logging setup.

use std::env;

use log::LevelFilter;

/// Initialize the logger from the `--debug` flag or `RUST_LOG`.
///
/// `--debug` forces debug level, otherwise `RUST_LOG` is honoured when set,
/// otherwise only warnings are shown. Safe to call more than once.
pub fn init_logger(debug: bool) {
    let result = if debug {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Debug)
            .try_init()
    } else if env::var("RUST_LOG").is_ok() {
        env_logger::try_init()
    } else {
        env_logger::Builder::new()
            .filter_level(LevelFilter::Warn)
            .try_init()
    };

    if result.is_err() {
        log::trace!("logger already initialized");
    }
}
