//! Diagnostics for the console and the Q client.
//!
//! Tracing goes to stderr; console replies go to stdout and are unaffected.
//! The targets worth filtering on are `aigmos` (pipeline, runners, events,
//! snapshots) and `qclient` (job submit/poll/cancel).

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Checked before `RUST_LOG`.
pub const LOG_ENV: &str = "AIGMOS_LOG";

pub const DEFAULT_FILTER: &str = "warn";

/// Pick the filter directives: `AIGMOS_LOG`, then `RUST_LOG`, then `warn`.
/// Blank values are ignored.
pub fn filter_directives(aigmos_log: Option<String>, rust_log: Option<String>) -> String {
    [aigmos_log, rust_log]
        .into_iter()
        .flatten()
        .find(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Initialize the tracing subscriber (stderr, compact format).
///
/// # Example
/// ```bash
/// AIGMOS_LOG=aigmos=debug,qclient=debug aigmos -c "Q hello"
/// ```
pub fn init() {
    let directives = filter_directives(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
    );
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_variable_wins_over_rust_log() {
        assert_eq!(
            filter_directives(Some("aigmos=debug".into()), Some("info".into())),
            "aigmos=debug"
        );
        assert_eq!(
            filter_directives(Some("  ".into()), Some("qclient=trace".into())),
            "qclient=trace"
        );
        assert_eq!(filter_directives(None, None), DEFAULT_FILTER);
    }
}
