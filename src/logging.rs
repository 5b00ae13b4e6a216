//! ## Logging Configuration
//!
//! This module sets up logging automatically at program startup using the `ctor` crate.
//! Logging behavior is controlled by the `DEBUG_TAXI_TRANSFORM` environment variable:
//!
//! - **Disabled** (default): If the variable is unset, empty, or explicitly set to `"0"` or `"false"`,
//!   no logging will be initialized.
//! - **Enabled**: Any other value enables logging with a maximum log level of `DEBUG`.
//!
//! The analyze pass and the transforms emit `tracing` events: one `info` event per transform
//! stage naming the columns it handles, and `debug` events with the computed statistics.
//!
//! ### Usage Example
//!
//! ```sh
//! export DEBUG_TAXI_TRANSFORM=true
//! ```

use ctor::ctor;
use tracing::Level;

/// Environment variable that switches on the debug subscriber.
pub const DEBUG_ENV_VAR: &str = "DEBUG_TAXI_TRANSFORM";

/// Returns true if the given value of [`DEBUG_ENV_VAR`] leaves logging off.
pub fn is_logging_disabled(value: Option<&str>) -> bool {
    value.map_or(true, |v| v == "0" || v == "false" || v.is_empty())
}

#[ctor]
fn set_debug_level() {
    let value = std::env::var(DEBUG_ENV_VAR).ok();

    if !is_logging_disabled(value.as_deref()) {
        // Another subscriber may already be installed by the host program.
        let _ = tracing_subscriber::fmt()
            .with_max_level(Level::DEBUG)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_switch_values() {
        assert!(is_logging_disabled(None));
        assert!(is_logging_disabled(Some("")));
        assert!(is_logging_disabled(Some("0")));
        assert!(is_logging_disabled(Some("false")));
        assert!(!is_logging_disabled(Some("1")));
        assert!(!is_logging_disabled(Some("true")));
    }
}
