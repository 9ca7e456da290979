//! Tracing targets used across the workspace.
//!
//! Every target shares the [`ROOT`] prefix so a single `RUST_LOG=archives=debug`
//! directive enables all of them.

/// Prefix shared by every target.
pub const ROOT: &str = "archives";

/// Format identification: probes, matches and fallbacks.
pub const IDENTIFY: &str = "archives::identify";

/// Entry walks during extraction, including skipped and failed entries.
pub const EXTRACT: &str = "archives::extract";

/// Lazy index construction in the archive file system.
pub const INDEX: &str = "archives::index";

/// Archive creation.
pub const ARCHIVE: &str = "archives::archive";

/// File system facade operations.
pub const FS: &str = "archives::fs";

/// Every target, in the order they are documented.
pub const ALL: &[&str] = &[IDENTIFY, EXTRACT, INDEX, ARCHIVE, FS];
