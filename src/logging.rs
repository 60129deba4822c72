//! Logging setup using the `tracing` ecosystem.
//!
//! Log lines go to stderr so report output on stdout stays clean.
//!
//! The level is chosen in this order:
//! 1. `--verbose`: debug for exportscope
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`, when set
//! 4. info for exportscope

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "exportscope=info";

/// Builds the filter for the given verbosity flags. `verbose` wins over `quiet`.
pub fn build_filter(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("exportscope=debug")
    } else if quiet {
        EnvFilter::new("exportscope=error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Installs the global subscriber. Calling it again is a no-op.
///
/// ```rust,no_run
/// use exportscope::logging::init_logger;
///
/// init_logger(false, false, false);
/// tracing::info!("starting analysis");
/// ```
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .compact();

    // Fails only when a subscriber is already installed.
    let _ = tracing_subscriber::registry()
        .with(build_filter(verbose, quiet))
        .with(fmt_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_levels() {
        assert_eq!(build_filter(true, false).to_string(), "exportscope=debug");
        assert_eq!(build_filter(false, true).to_string(), "exportscope=error");
        assert_eq!(build_filter(true, true).to_string(), "exportscope=debug");
    }

    #[test]
    fn test_init_logger_twice_does_not_panic() {
        init_logger(false, true, true);
        init_logger(true, false, true);
    }
}
