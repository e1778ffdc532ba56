//! Crate-level configuration defaults.

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    "verideck=info,reqwest=warn".to_string()
}
