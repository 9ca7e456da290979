//! Log configuration derived from a verbosity count.

use std::fmt;

use tracing::Level;

use crate::targets;

/// Verbosity knobs translated into a tracing filter directive.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogConfig {
    /// Level applied to every target that is not listed in `overrides`.
    pub default_level: LevelName,
    /// Per-target levels, as `(target, level)` pairs.
    pub overrides: Vec<(String, LevelName)>,
    /// Whether to print event targets in formatted output.
    pub show_targets: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from_verbose_level(0)
    }
}

impl LogConfig {
    /// Create a configuration from a `-v` count.
    ///
    /// - `0`: warnings and errors only.
    /// - `1`: workspace targets at `info`.
    /// - `2`: workspace targets at `debug`.
    /// - `3` or more: workspace targets at `trace`.
    #[must_use]
    pub fn from_verbose_level(level: u8) -> Self {
        let workspace = match level {
            0 => None,
            1 => Some(LevelName::Info),
            2 => Some(LevelName::Debug),
            _ => Some(LevelName::Trace),
        };
        Self {
            default_level: LevelName::Warn,
            overrides: workspace
                .map(|level| vec![(targets::ROOT.to_owned(), level)])
                .unwrap_or_default(),
            show_targets: level >= 2,
        }
    }

    /// Sets the level for one target, replacing an earlier override.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>, level: LevelName) -> Self {
        let target = target.into();
        self.overrides.retain(|(existing, _)| *existing != target);
        self.overrides.push((target, level));
        self
    }

    /// Renders the configuration as an `EnvFilter` directive string.
    #[must_use]
    pub fn directives(&self) -> String {
        let mut out = self.default_level.to_string();
        for (target, level) in &self.overrides {
            out.push(',');
            out.push_str(target);
            out.push('=');
            out.push_str(level.as_str());
        }
        out
    }

    /// Returns the most verbose level any target is configured for.
    #[must_use]
    pub fn max_level(&self) -> Level {
        self.overrides
            .iter()
            .map(|(_, level)| level.to_level())
            .fold(self.default_level.to_level(), Ord::max)
    }
}

/// Serializable mirror of [`tracing::Level`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LevelName {
    /// `error`
    Error,
    /// `warn`
    Warn,
    /// `info`
    Info,
    /// `debug`
    Debug,
    /// `trace`
    Trace,
}

impl LevelName {
    /// Lowercase directive spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Converts to the tracing level.
    #[must_use]
    pub const fn to_level(self) -> Level {
        match self {
            Self::Error => Level::ERROR,
            Self::Warn => Level::WARN,
            Self::Info => Level::INFO,
            Self::Debug => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

impl fmt::Display for LevelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
