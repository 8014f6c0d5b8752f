//! The wire codec: primitives, the field model, and the engines.
//!
//! Layering, leaves first:
//!
//! - [`limits`]: hard size, depth, and field-number limits
//! - [`wire`]: varint/ZigZag/fixed primitives and the buffer cursors
//! - [`tag`]: field-number + wire-type tag composition
//! - [`types`]: storage wrappers selecting non-default encodings
//! - [`value`]: per-type wire behavior
//! - [`rules`]: per-field behavior (presence wrappers and containers)
//! - [`map_entry`]: the keyed-pair facade behind map fields
//! - [`message`]: the [`Message`](message::Message) trait and macros
//! - [`parse`] / [`serialize`]: the engine entry points

pub mod limits;
pub mod map_entry;
pub mod message;
pub mod parse;
pub mod rules;
pub mod serialize;
pub mod tag;
pub mod types;
pub mod value;
pub mod wire;
