//! Size pre-pass and serialize engine.
//!
//! Encoding is a two-phase contract: [`encoded_size`] validates the whole
//! object graph and reports the exact byte count, the caller allocates, and
//! [`encode`] then writes without any failure path. Nested payload sizes
//! are recomputed at emission time, which duplicates a little arithmetic
//! but keeps the message model free of cached state.

use crate::codec::limits::MAX_SERIALIZED_SIZE;
use crate::codec::message::Message;
use crate::codec::wire::Encoder;
use crate::error::Error;

/// Computes the serialized size of `message` in bytes, validating the
/// object graph on the way
///
/// Returns `-1` if the encoding would exceed [`MAX_SERIALIZED_SIZE`] or
/// nest past the depth limit. Intermediate per-field totals may exceed the
/// limit transiently; the range check happens once, here, against a 64-bit
/// accumulator.
pub fn encoded_size<'b, M: Message<'b>>(message: &M) -> i32 {
    let total = message.size_of_fields(0);
    if total <= MAX_SERIALIZED_SIZE as i64 {
        total as i32
    } else {
        -1
    }
}

/// Serializes `message` into `buf`, returning the number of bytes written
///
/// `buf` must hold exactly the size reported by [`encoded_size`], which
/// must not have been negative. Under that precondition this cannot fail;
/// violating it is a caller bug and panics on the buffer bounds.
pub fn encode<'b, M: Message<'b>>(message: &M, buf: &mut [u8]) -> usize {
    debug_assert!(
        encoded_size(message) as usize == buf.len(),
        "encode() requires a buffer of exactly the pre-computed size"
    );
    let mut enc = Encoder::new(buf);
    message.encode_fields(&mut enc);
    enc.position()
}

/// Sizes, allocates, and serializes in one step
pub fn encode_to_vec<'b, M: Message<'b>>(message: &M) -> Result<Vec<u8>, Error> {
    let size = encoded_size(message);
    if size < 0 {
        return Err(Error::MessageTooLarge);
    }
    let mut buf = vec![0u8; size as usize];
    encode(message, &mut buf);
    Ok(buf)
}
