//! Oxipatch: VCDIFF (RFC 3284) binary delta patch decoder.
//!
//! Reconstructs a target byte sequence from a source byte sequence plus a
//! VCDIFF-encoded patch (the format produced by xdelta).  The crate is a
//! pure decoder: encoding, secondary compression, and custom code tables
//! are out of scope (the latter two are detected and rejected).
//!
//! # Quick Start
//!
//! ```no_run
//! let source = std::fs::read("app-v1.bin").unwrap();
//! let patch = std::fs::read("v1-to-v2.vcdiff").unwrap();
//! let target = oxipatch::apply(&source, &patch).unwrap();
//! ```
//!
//! For stream-based use, construct a [`Decoder`] over any
//! `Read + Seek` / `Read + Write + Seek` streams and call
//! [`Decoder::run`].
//!
//! # Modules
//!
//! - `reader`     — byte/varint cursor over the patch stream
//! - `header`     — file header parsing
//! - `window`     — per-window parsing and cross-validation
//! - `code_table` — default RFC 3284 code table
//! - `cache`      — NEAR/SAME COPY address cache
//! - `decoder`    — window loop and instruction interpreter

pub mod cache;
pub mod code_table;
pub mod decoder;
pub mod error;
pub mod header;
pub mod reader;
pub mod section;
pub mod varint;
pub mod window;

pub use decoder::{Decoder, apply};
pub use error::DecodeError;
pub use header::Header;
pub use window::{CompressedFields, Window, WindowFields};
