// Enforce at crate level
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

//! MIME Structure Walker
//!
//! Reconstructs the part tree of a raw email message and hands every
//! non-container part to a visitor, depth first.
//!
//! # Features
//!
//! - Process-wide unique sequence numbers and depth for every part
//! - Bodies buffered in memory up to a threshold, spilled to temp files past it
//! - SHA-512/224 digest of each body, computed while it is buffered
//! - Safe file names, declared or synthesized from depth, sequence and type
//! - Ordered, multi-valued header projection with RFC 2047 decoding
//! - Messages read from a stream or assembled from headers and a body
//!
//! # Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use mimewalk::{WalkConfig, walk_message};
//!
//! let raw = b"From: sender@example.com\r\n\
//!             Content-Type: multipart/mixed; boundary=XX\r\n\
//!             \r\n\
//!             --XX\r\n\
//!             Content-Type: text/plain\r\n\
//!             \r\n\
//!             hello\r\n\
//!             --XX--\r\n";
//!
//! let mut names = Vec::new();
//! walk_message(raw, &WalkConfig::default(), false, |part| {
//!     names.push(part.file_name.clone().unwrap_or_default());
//!     Ok(ControlFlow::Continue(()))
//! })
//! .unwrap();
//!
//! assert_eq!(names.len(), 1);
//! ```

mod buffer;
mod config;
mod entity;
mod error;
mod filename;
mod hash;
mod header;
mod message;
mod part;
mod walker;

pub use buffer::{DEFAULT_THRESHOLD, SectionBuffer, SectionView};
pub use config::{DEFAULT_MAX_DEPTH, WalkConfig};
pub use entity::{Entity, parse_message};
pub use error::{BoxError, ConfigError, Result, WalkError};
pub use filename::{FALLBACK_EXTENSION, FILE_NAME_KEY, extension_for, sanitize, synthesize};
pub use hash::{ContentHasher, DIGEST_LEN, HASH_KEY_NAME, HashingReader, hash_bytes};
pub use header::{Headers, canonical_key, decode_value};
pub use message::{MAX_HEADER_BLOCK, Message};
pub use part::{ContentType, DEFAULT_MEDIA_TYPE, Part};
pub use walker::{Node, NodeKind, Outline, VisitResult, Walker, walk_message};
