//! Hard limits enforced by the codec.
//!
//! These match the limits used by the widely-deployed Protocol Buffers
//! implementations, so wire data produced here is accepted elsewhere and
//! vice versa.

/// Maximum number of serialized bytes for an outermost message: 64 MiB
pub const MAX_SERIALIZED_SIZE: i32 = 64 << 20;

/// Maximum message nesting depth accepted by the parser
pub const MAX_MESSAGE_NESTING_DEPTH: u32 = 100;

/// Maximum valid field number: 2^29 - 1
pub const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Number of bytes in the longest varint that can encode
/// [`MAX_SERIALIZED_SIZE`]
pub const MAX_LENGTH_PREFIX_SIZE: i32 = longest_varint_for(MAX_SERIALIZED_SIZE as u64);

/// Maximum payload length of a single length-delimited value: the overall
/// size limit minus the worst-case length prefix that announced it
pub const MAX_PAYLOAD_SIZE: u32 = (MAX_SERIALIZED_SIZE - MAX_LENGTH_PREFIX_SIZE) as u32;

const fn longest_varint_for(value: u64) -> i32 {
    let bits = 64 - value.leading_zeros() as i32;
    (bits + 6) / 7
}

/// Sentinel returned by the size pre-pass when a value would serialize past
/// [`MAX_SERIALIZED_SIZE`]
///
/// The value is chosen to be larger than the limit yet small enough that a
/// caller summing many sentinels into a 64-bit accumulator cannot wrap
/// before the final range check runs.
pub const OVERSIZE_SENTINEL: i64 = MAX_SERIALIZED_SIZE as i64 + 1;

/// Sentinel returned by the size pre-pass when message nesting exceeds
/// [`MAX_MESSAGE_NESTING_DEPTH`], e.g. from a cyclic object graph
///
/// Subject to the same no-wrap constraint as [`OVERSIZE_SENTINEL`].
pub const OVERDEPTH_SENTINEL: i64 = MAX_SERIALIZED_SIZE as i64 + 2;

/// Returns true if `x` is within the range of valid field numbers
///
/// Field numbers must be in the range 1 to 2^29 - 1, and also not in the
/// range 19000 to 19999, which is reserved for the Protocol Buffers
/// implementation itself.
#[must_use]
pub const fn is_valid_field_number(x: i32) -> bool {
    (x >= 1) && (x < 19000 || x > 19999) && (x <= MAX_FIELD_NUMBER)
}
