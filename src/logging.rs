use log::LevelFilter;

/// Initializes the logger with the `env_logger` crate.
///
/// `RUST_LOG` decides what is shown; without it only warnings and errors are.
pub fn init_logger() {
    init_with_verbosity(0);
}

/// Initializes `env_logger`, defaulting to the level chosen by `-v` flags
/// when `RUST_LOG` is unset.
///
/// Calling this twice is harmless; the second call is ignored.
pub fn init_with_verbosity(verbosity: u8) {
    let default_level = level_for_verbosity(verbosity);
    let result = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_millis()
        .try_init();
    if result.is_err() {
        log::debug!("Logger already initialized");
    }
}

/// `0` = warn, `1` = info, `2` = debug, `3+` = trace (hex dumps).
pub fn level_for_verbosity(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
