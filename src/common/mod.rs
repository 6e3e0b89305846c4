//! Common functionality.

use byte_unit::{Byte, UnitType};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};

pub mod io;

/// Commonly used command line arguments.
#[derive(Parser, Debug)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            verbose: Verbosity::new(0, 0),
        }
    }
}

/// Helper to print the current memory resident set size via `tracing`.
pub fn trace_rss_now() {
    let rss = procfs::process::Process::myself()
        .and_then(|me| me.stat())
        .map(|stat| stat.rss * procfs::page_size());
    match rss {
        Ok(rss) => tracing::debug!(
            "RSS now: {:.2}",
            Byte::from_u64(rss).get_appropriate_unit(UnitType::Binary)
        ),
        Err(e) => tracing::trace!("could not determine RSS: {}", e),
    }
}

/// Map the verbosity flags to the `tracing` level to use.
pub fn tracing_level(args: &Args) -> tracing::Level {
    match args.verbose.log_level() {
        Some(level) => match level {
            log::Level::Error => tracing::Level::ERROR,
            log::Level::Warn => tracing::Level::WARN,
            log::Level::Info => tracing::Level::INFO,
            log::Level::Debug => tracing::Level::DEBUG,
            log::Level::Trace => tracing::Level::TRACE,
        },
        None => tracing::Level::INFO,
    }
}

/// The version of `pgx-cpic-worker` package.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Return the version of the `pgx-cpic-worker` crate and `x.y.z` in tests.
pub fn worker_version() -> &'static str {
    if cfg!(test) {
        "x.y.z"
    } else {
        VERSION
    }
}

#[cfg(test)]
mod test {
    use clap_verbosity_flag::Verbosity;
    use pretty_assertions::assert_eq;

    use super::*;

    #[rstest::rstest]
    #[case(0, 0, tracing::Level::INFO)]
    #[case(1, 0, tracing::Level::DEBUG)]
    #[case(2, 0, tracing::Level::TRACE)]
    #[case(0, 1, tracing::Level::WARN)]
    fn tracing_level_from_verbosity(
        #[case] verbose: u8,
        #[case] quiet: u8,
        #[case] expected: tracing::Level,
    ) {
        let args = Args {
            verbose: Verbosity::new(verbose, quiet),
        };

        assert_eq!(tracing_level(&args), expected);
    }

    #[test]
    fn worker_version_in_tests() {
        assert_eq!(worker_version(), "x.y.z");
    }
}
