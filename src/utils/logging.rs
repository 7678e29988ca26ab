use tracing::Level;

/// Install the tracing subscriber used by the hutch binaries.
///
/// `level` names the maximum level to emit; anything unrecognized falls
/// back to `info`. Uses `try_init` so tests and embedders that already
/// installed a subscriber are left alone.
pub fn init(level: &str) {
    let max = match level.to_lowercase().as_str() {
        "error" => Level::ERROR,
        "warn" | "warning" => Level::WARN,
        "debug" => Level::DEBUG,
        "trace" => Level::TRACE,
        _ => Level::INFO,
    };

    let _ = tracing_subscriber::fmt()
        .with_max_level(max)
        .with_target(false)
        .try_init();
}
