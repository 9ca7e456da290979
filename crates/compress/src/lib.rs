#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `compress` wraps the single-stream codecs understood by the `archives`
//! workspace behind one uniform shape. Every codec module exposes a counting
//! streaming encoder, a `decoder` constructor over any [`std::io::Read`], and
//! `compress_to_vec`/`decompress_to_vec` conveniences.
//! [`algorithm::CompressionAlgorithm`] erases the concrete types so format
//! registries can hold codecs as data.
//!
//! # Design
//!
//! - [`gzip`] and [`zlib`] are always available through
//!   [`flate2`](https://docs.rs/flate2).
//! - [`zstd`], [`lz4`], [`bzip2`], [`xz`] and [`brotli`] are gated by cargo
//!   features of the same name, all enabled by default.
//! - Encoders write through an internal counting adapter so callers learn the
//!   compressed size without buffering it.
//!
//! # Invariants
//!
//! - Streams are finalised explicitly via `finish_into_inner` or
//!   [`StreamEncoder::finish_stream`], which emit trailer bytes and report
//!   the final compressed length. Dropping an encoder does not finish it.
//! - Decoders accept concatenated members or frames where the format allows.
//! - Signature checks never match a truncated prefix.
//!
//! # Errors
//!
//! All encoder and decoder functions return [`std::io::Result`]. Codec
//! failures that are not I/O errors are wrapped with
//! [`std::io::Error::other`].
//!
//! # Examples
//!
//! ```
//! use compress::algorithm::CompressionAlgorithm;
//! use compress::CompressionLevel;
//!
//! # fn main() -> std::io::Result<()> {
//! let gzip: CompressionAlgorithm = "gz".parse().expect("known codec");
//! let compressed = gzip.compress_to_vec(b"payload", CompressionLevel::Default)?;
//! assert!(gzip.matches_prefix(&compressed));
//! assert_eq!(gzip.decompress_to_vec(&compressed)?, b"payload");
//! # Ok(())
//! # }
//! ```

pub mod algorithm;
#[cfg(feature = "brotli")]
pub mod brotli;
#[cfg(feature = "bzip2")]
pub mod bzip2;
mod common;
pub mod gzip;
#[cfg(feature = "lz4")]
pub mod lz4;
#[cfg(feature = "xz")]
pub mod xz;
pub mod zlib;
#[cfg(feature = "zstd")]
pub mod zstd;

pub use algorithm::{CompressionAlgorithm, CompressionAlgorithmParseError};
pub use common::{CountingSink, StreamEncoder, has_magic};
pub use zlib::{CompressionLevel, CompressionLevelError};
