//! Environment variable utilities
//!
//! Used for the `INITR_*` configuration overrides.

/// Get environment variable as Option
///
/// Returns `None` when unset or empty.
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get environment variable as boolean
///
/// Returns `Some(true)` for "true", "1", "yes", "on" and `Some(false)` for
/// "false", "0", "no", "off" (case-insensitive). Anything else, or an
/// unset variable, is `None`.
pub fn env_bool(key: &str) -> Option<bool> {
    let value = env_opt(key)?.to_lowercase();
    match value.as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
