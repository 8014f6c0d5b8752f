//! # prowire-core
//!
//! A declarative codec for the Protocol Buffers wire format, plus a
//! forensic inspector for wire data of unknown provenance.
//!
//! This crate provides the core functionality for:
//! - Declaring message layouts as ordinary Rust structs with a static
//!   field list, with no schema compiler involved
//! - Serializing and parsing those messages with exact pre-computed sizes
//! - Recovering probable message structure from arbitrary bytes and
//!   rendering it as an annotated hex dump
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`codec`]: Wire primitives, the field model, and the
//!   serialize/parse engines
//! - [`inspect`]: The two-mode scanner and the hex-dump renderer
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use prowire_core::{decode, encode_to_vec, wire_message};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct AudioConfig {
//!     sample_rate: i32,
//!     bit_depth: i32,
//!     channel_count: i32,
//! }
//!
//! wire_message!(AudioConfig {
//!     1 => sample_rate,
//!     2 => bit_depth,
//!     3 => channel_count,
//! });
//!
//! let config = AudioConfig {
//!     sample_rate: 48_000,
//!     bit_depth: 24,
//!     channel_count: 5,
//! };
//!
//! let bytes = encode_to_vec(&config)?;
//! let received: AudioConfig = decode(&bytes)?;
//! assert_eq!(config, received);
//! # Ok::<(), prowire_core::Error>(())
//! ```
//!
//! ## Inspecting unknown bytes
//!
//! ```
//! use prowire_core::inspect::{render_to_string, scan, RenderContext};
//!
//! let bytes = b"\x08\x96\x01not wire data";
//! let spans = scan(bytes, /* permissive */ true);
//! println!("{}", render_to_string(bytes, &spans, &RenderContext::new()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod codec;
pub mod error;
pub mod inspect;

// Re-export primary types for convenience
pub use codec::limits::{MAX_FIELD_NUMBER, MAX_MESSAGE_NESTING_DEPTH, MAX_SERIALIZED_SIZE};
pub use codec::message::Message;
pub use codec::parse::{decode, merge};
pub use codec::serialize::{encode, encode_to_vec, encoded_size};
pub use codec::types::{
    Boxed, ByteView, Bytes, Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64,
};
pub use codec::value::Value;
pub use codec::wire::WireType;
pub use error::{DecodeError, Error, Result};
pub use inspect::{
    inspect_file, parse_probable_message, render, render_to_string, scan, RenderContext, Span,
    SpanKind,
};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
