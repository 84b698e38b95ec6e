//! Log level resolution
//!
//! `OASIS_LOG_LEVEL` is matched on its first letter only, so `d`, `Debug`
//! and `DEBUG` all select debug output.

use tracing::Level;

/// Environment variable selecting the log level
pub const LOG_LEVEL_ENV_VAR: &str = "OASIS_LOG_LEVEL";

/// Parse a log level name by its first letter (d/i/w/e, plus t for trace).
///
/// Returns `None` for empty or unrecognised values.
pub fn parse_level(value: &str) -> Option<Level> {
    match value.trim().chars().next()?.to_ascii_lowercase() {
        't' => Some(Level::TRACE),
        'd' => Some(Level::DEBUG),
        'i' => Some(Level::INFO),
        'w' => Some(Level::WARN),
        'e' => Some(Level::ERROR),
        _ => None,
    }
}

/// Resolve the log level from the environment, then the configured value.
///
/// The second element carries the raw value that could not be parsed, if
/// any, so the caller can warn once logging is up.
pub fn resolve_level(configured: Option<&str>) -> (Level, Option<String>) {
    let from_env = std::env::var(LOG_LEVEL_ENV_VAR).ok().filter(|v| !v.is_empty());

    match from_env.as_deref().or(configured) {
        Some(value) => match parse_level(value) {
            Some(level) => (level, None),
            None => (Level::INFO, Some(value.to_string())),
        },
        None => (Level::INFO, None),
    }
}
