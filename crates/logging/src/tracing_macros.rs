//! Convenience macros for subsystem tracing.
//!
//! These wrap the standard tracing macros with the targets from
//! [`crate::targets`]. Callers pick the level explicitly as the first token:
//!
//! ```ignore
//! trace_extract!(debug, path = %entry.path(), "visiting entry");
//! ```

/// Emit an identification trace.
///
/// # Example
/// ```ignore
/// trace_identify!(debug, format = name, "stream matched");
/// ```
#[macro_export]
macro_rules! trace_identify {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!(target: $crate::targets::IDENTIFY, $($arg)*)
    };
}

/// Emit an extraction trace.
///
/// # Example
/// ```ignore
/// trace_extract!(warn, path = %path, error = %err, "entry failed");
/// ```
#[macro_export]
macro_rules! trace_extract {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!(target: $crate::targets::EXTRACT, $($arg)*)
    };
}

/// Emit an index construction trace.
///
/// # Example
/// ```ignore
/// trace_index!(debug, entries = count, "index built");
/// ```
#[macro_export]
macro_rules! trace_index {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!(target: $crate::targets::INDEX, $($arg)*)
    };
}

/// Emit an archive creation trace.
///
/// # Example
/// ```ignore
/// trace_archive!(debug, path = %name, "adding entry");
/// ```
#[macro_export]
macro_rules! trace_archive {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!(target: $crate::targets::ARCHIVE, $($arg)*)
    };
}

/// Emit a file system trace.
///
/// # Example
/// ```ignore
/// trace_fs!(trace, name = %name, "open");
/// ```
#[macro_export]
macro_rules! trace_fs {
    ($level:ident, $($arg:tt)*) => {
        ::tracing::$level!(target: $crate::targets::FS, $($arg)*)
    };
}
