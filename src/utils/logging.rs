use tracing::Level;

/// Map a `log_level` setting (`LOG_LEVEL`) to a tracing level.
///
/// Matching ignores case; anything unrecognised means `info`, so a typo in
/// the environment never stops the relay from starting.
pub fn level_for(name: &str) -> Level {
    match name.trim().to_ascii_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    }
}

/// Install the relay's stdout subscriber.
///
/// At `debug` every datagram, subscription change, fan-out and eviction is
/// traced; `info` keeps the listening address and the periodic client count.
/// The binary may call this twice (once to report a config error, once with
/// the configured level); only the first call takes effect.
pub fn init(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level_for(level))
        .with_target(false)
        .try_init();
}
