#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` centralises the tracing conventions of the `archives` workspace:
//! the [`targets`] every crate logs under, `trace_*!` macros that pin those
//! targets, and a [`LogConfig`] that maps a `-v` count onto a filter.
//!
//! # Design
//!
//! Library crates only emit events; they never install a subscriber. Binaries
//! and tests call [`init_tracing`] (feature `subscriber`, on by default), which
//! installs a `tracing-subscriber` fmt layer behind an `EnvFilter`. When
//! `RUST_LOG` is set it takes precedence over the configuration.
//!
//! # Examples
//!
//! ```
//! use logging::{LogConfig, targets};
//!
//! let config = LogConfig::from_verbose_level(2);
//! assert_eq!(config.directives(), format!("warn,{}=debug", targets::ROOT));
//! ```

mod config;
pub mod targets;
mod tracing_macros;

pub use config::{LevelName, LogConfig};

/// Installs a global fmt subscriber filtered according to `config`.
///
/// # Panics
///
/// Panics when a global subscriber is already installed. Use
/// [`try_init_tracing`] where that can happen, such as in tests.
#[cfg(feature = "subscriber")]
pub fn init_tracing(config: &LogConfig) {
    if let Err(err) = try_init_tracing(config) {
        panic!("failed to install tracing subscriber: {err}");
    }
}

/// Installs a global fmt subscriber, reporting failure instead of panicking.
#[cfg(feature = "subscriber")]
pub fn try_init_tracing(
    config: &LogConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.directives()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(config.show_targets)
                .with_writer(std::io::stderr),
        )
        .try_init()
}
