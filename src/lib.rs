pub mod core;
pub mod models;
pub mod platform;

pub use crate::core::config::ScanConfig;
pub use crate::core::scan_session::{ScanHandle, ScanOutcome, ScanSession};
pub use crate::core::session_reporter::{HttpSessionBackend, SessionReporter};
pub use crate::models::classification::ClassificationResult;
pub use crate::models::session::SessionContext;

use tracing_subscriber::{fmt, EnvFilter};

/// Log filter used when `RUST_LOG` is unset, empty or unparsable
pub const DEFAULT_LOG_FILTER: &str = "hautfit_lib=info,hautfit=info";

fn build_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|e| {
            eprintln!("Ignoring invalid {}: {}", EnvFilter::DEFAULT_ENV, e);
            EnvFilter::new(DEFAULT_LOG_FILTER)
        }),
        None => EnvFilter::new(DEFAULT_LOG_FILTER),
    }
}

/// Install the global log subscriber.
///
/// `RUST_LOG` decides verbosity when it is set. Otherwise [`DEFAULT_LOG_FILTER`] applies.
pub fn init_logging() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref());

    // Ignore a second install, e.g. when embedded in a host that already set one
    let _ = fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rust_log_overrides_default_level() {
        let filter = build_filter(Some("hautfit_lib=debug")).to_string();
        assert!(filter.contains("hautfit_lib=debug"));
        assert!(!filter.contains("hautfit_lib=info"));

        let filter = build_filter(Some("warn")).to_string();
        assert!(!filter.contains("hautfit_lib=info"));
    }

    #[test]
    fn test_default_filter_without_rust_log() {
        for rust_log in [None, Some(""), Some("  ")] {
            let filter = build_filter(rust_log).to_string();
            assert!(filter.contains("hautfit_lib=info"));
            assert!(filter.contains("hautfit=info"));
        }
    }
}
