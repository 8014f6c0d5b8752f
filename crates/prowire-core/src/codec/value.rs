//! The [`Value`] trait: per-type wire behavior (sizing, emission, and
//! merging) for everything that can sit in a field position.
//!
//! Scalar and string impls live here. Message types receive their impl from
//! the [`wire_message!`](crate::wire_message) macro, and enums from
//! [`wire_enum!`](crate::wire_enum).

use crate::codec::limits::{MAX_SERIALIZED_SIZE, OVERSIZE_SENTINEL};
use crate::codec::types::{ByteView, Bytes, Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64};
use crate::codec::wire::{
    signed_varint_size, varint_size, zigzag_decode32, zigzag_decode64, zigzag_encode32,
    zigzag_encode64, Decoder, Encoder, WireType,
};
use crate::error::DecodeError;

/// Wire behavior of one value
///
/// The lifetime `'b` is the parse buffer's: value types that borrow from
/// the buffer (see [`ByteView`]) tie themselves to it, everything else
/// implements the trait for all lifetimes.
pub trait Value<'b>: Default {
    /// The wire type this value is encoded with
    const WIRE_TYPE: WireType;

    /// Encoded size of the value alone, excluding any tag
    ///
    /// For length-delimited values this includes the length prefix.
    /// `depth` counts message nesting; a message deeper than the limit
    /// reports the depth sentinel instead of a size.
    fn encoded_size(&self, depth: u32) -> i64;

    /// Writes the value
    ///
    /// The caller has sized the buffer via [`Value::encoded_size`], so
    /// emission cannot fail.
    fn encode(&self, enc: &mut Encoder<'_>);

    /// Parses one wire value into `self`, merging where the type has
    /// merge semantics (messages), overwriting otherwise
    fn merge(&mut self, dec: &mut Decoder<'b>, depth: u32) -> Result<(), DecodeError>;
}

macro_rules! unsigned_varint_value {
    ($($ty:ty),+) => {
        $(
            impl<'b> Value<'b> for $ty {
                const WIRE_TYPE: WireType = WireType::Varint;

                fn encoded_size(&self, _depth: u32) -> i64 {
                    varint_size(*self as u64) as i64
                }

                fn encode(&self, enc: &mut Encoder<'_>) {
                    enc.put_varint(*self as u64);
                }

                fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
                    *self = dec.read_varint()? as $ty;
                    Ok(())
                }
            }
        )+
    };
}

unsigned_varint_value!(u32, u64);

macro_rules! signed_varint_value {
    ($($ty:ty),+) => {
        $(
            impl<'b> Value<'b> for $ty {
                const WIRE_TYPE: WireType = WireType::Varint;

                fn encoded_size(&self, _depth: u32) -> i64 {
                    signed_varint_size(*self as i64) as i64
                }

                fn encode(&self, enc: &mut Encoder<'_>) {
                    enc.put_signed_varint(*self as i64);
                }

                fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
                    // Oversized wire values truncate into the declared width.
                    *self = dec.read_varint()? as $ty;
                    Ok(())
                }
            }
        )+
    };
}

signed_varint_value!(i32, i64);

impl<'b> Value<'b> for bool {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encoded_size(&self, _depth: u32) -> i64 {
        1
    }

    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.put_varint(u64::from(*self));
    }

    fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
        *self = dec.read_bool()?;
        Ok(())
    }
}

impl<'b> Value<'b> for Sint32 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encoded_size(&self, _depth: u32) -> i64 {
        varint_size(zigzag_encode32(self.0) as u64) as i64
    }

    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.put_varint(zigzag_encode32(self.0) as u64);
    }

    fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
        self.0 = zigzag_decode32(dec.read_varint32()?);
        Ok(())
    }
}

impl<'b> Value<'b> for Sint64 {
    const WIRE_TYPE: WireType = WireType::Varint;

    fn encoded_size(&self, _depth: u32) -> i64 {
        varint_size(zigzag_encode64(self.0)) as i64
    }

    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.put_varint(zigzag_encode64(self.0));
    }

    fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
        self.0 = zigzag_decode64(dec.read_varint()?);
        Ok(())
    }
}

macro_rules! fixed32_value {
    ($($ty:ty => $get:expr, $set:expr;)+) => {
        $(
            impl<'b> Value<'b> for $ty {
                const WIRE_TYPE: WireType = WireType::I32;

                fn encoded_size(&self, _depth: u32) -> i64 {
                    4
                }

                fn encode(&self, enc: &mut Encoder<'_>) {
                    let get: fn(&$ty) -> u32 = $get;
                    enc.put_fixed32(get(self));
                }

                fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
                    let set: fn(&mut $ty, u32) = $set;
                    set(self, dec.read_fixed32()?);
                    Ok(())
                }
            }
        )+
    };
}

fixed32_value! {
    f32 => |v| v.to_bits(), |v, bits| *v = f32::from_bits(bits);
    Fixed32 => |v| v.0, |v, bits| v.0 = bits;
    Sfixed32 => |v| v.0 as u32, |v, bits| v.0 = bits as i32;
}

macro_rules! fixed64_value {
    ($($ty:ty => $get:expr, $set:expr;)+) => {
        $(
            impl<'b> Value<'b> for $ty {
                const WIRE_TYPE: WireType = WireType::I64;

                fn encoded_size(&self, _depth: u32) -> i64 {
                    8
                }

                fn encode(&self, enc: &mut Encoder<'_>) {
                    let get: fn(&$ty) -> u64 = $get;
                    enc.put_fixed64(get(self));
                }

                fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
                    let set: fn(&mut $ty, u64) = $set;
                    set(self, dec.read_fixed64()?);
                    Ok(())
                }
            }
        )+
    };
}

fixed64_value! {
    f64 => |v| v.to_bits(), |v, bits| *v = f64::from_bits(bits);
    Fixed64 => |v| v.0, |v, bits| v.0 = bits;
    Sfixed64 => |v| v.0 as u64, |v, bits| v.0 = bits as i64;
}

/// Size of a length-delimited payload of `len` bytes, or the oversize
/// sentinel when the payload alone would bust the ceiling
pub(crate) fn len_prefixed_size(len: usize) -> i64 {
    let prefix = varint_size(len as u64) as i64;
    if len as u64 > (MAX_SERIALIZED_SIZE as i64 - prefix) as u64 {
        return OVERSIZE_SENTINEL;
    }
    prefix + len as i64
}

impl<'b> Value<'b> for String {
    const WIRE_TYPE: WireType = WireType::Len;

    fn encoded_size(&self, _depth: u32) -> i64 {
        len_prefixed_size(self.len())
    }

    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.put_len_prefixed(self.as_bytes());
    }

    fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
        let len = dec.read_length()?;
        let bytes = dec.read_bytes(len)?;
        let text = std::str::from_utf8(bytes).map_err(|_| DecodeError)?;
        self.clear();
        self.push_str(text);
        Ok(())
    }
}

impl<'b> Value<'b> for Bytes {
    const WIRE_TYPE: WireType = WireType::Len;

    fn encoded_size(&self, _depth: u32) -> i64 {
        len_prefixed_size(self.len())
    }

    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.put_len_prefixed(self.as_slice());
    }

    fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
        let len = dec.read_length()?;
        let bytes = dec.read_bytes(len)?;
        self.0.clear();
        self.0.extend_from_slice(bytes);
        Ok(())
    }
}

impl<'b> Value<'b> for ByteView<'b> {
    const WIRE_TYPE: WireType = WireType::Len;

    fn encoded_size(&self, _depth: u32) -> i64 {
        len_prefixed_size(self.as_bytes().map_or(0, <[u8]>::len))
    }

    fn encode(&self, enc: &mut Encoder<'_>) {
        enc.put_len_prefixed(self.as_bytes().unwrap_or(&[]));
    }

    fn merge(&mut self, dec: &mut Decoder<'b>, _depth: u32) -> Result<(), DecodeError> {
        let len = dec.read_length()?;
        self.set(dec.read_bytes(len)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size_of<'b, V: Value<'b>>(value: &V) -> i64 {
        value.encoded_size(0)
    }

    fn encode_to_vec<'b, V: Value<'b>>(value: &V) -> Vec<u8> {
        let mut buf = vec![0u8; size_of(value) as usize];
        let buf_len = buf.len();
        let mut enc = Encoder::new(&mut buf);
        value.encode(&mut enc);
        assert_eq!(buf_len, enc.position());
        buf
    }

    fn parse<V: for<'b> Value<'b>>(bytes: &[u8]) -> Result<V, DecodeError> {
        let mut value = V::default();
        let mut dec = Decoder::new(bytes);
        value.merge(&mut dec, 0)?;
        assert!(dec.at_end());
        Ok(value)
    }

    #[test]
    fn unsigned_integers() {
        assert_eq!(vec![0x01], encode_to_vec(&1u32));
        assert_eq!(vec![0x80, 0x01], encode_to_vec(&128u32));
        assert_eq!(vec![0xff, 0xff, 0xff, 0xff, 0x0f], encode_to_vec(&u32::MAX));
        assert_eq!(
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01],
            encode_to_vec(&u64::MAX)
        );
        assert_eq!(300u64, parse::<u64>(&[0xAC, 0x02]).unwrap());
    }

    #[test]
    fn signed_integers_sign_extend() {
        // Negative values always cost 10 bytes, for both widths.
        let minus_one = vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01];
        assert_eq!(minus_one, encode_to_vec(&-1i32));
        assert_eq!(minus_one, encode_to_vec(&-1i64));
        assert_eq!(
            vec![0x80, 0x80, 0x80, 0x80, 0xf8, 0xff, 0xff, 0xff, 0xff, 0x01],
            encode_to_vec(&i32::MIN)
        );

        assert_eq!(-1i32, parse::<i32>(&minus_one).unwrap());
        assert_eq!(-1i64, parse::<i64>(&minus_one).unwrap());
    }

    #[test]
    fn signed_integers_truncate() {
        // A 64-bit reading of -1 truncates into i32 as -1.
        assert_eq!(
            -1i32,
            parse::<i32>(&[0xff, 0xff, 0xff, 0xff, 0x7f]).unwrap()
        );
        assert_eq!(
            0i32,
            parse::<i32>(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]).unwrap()
        );
    }

    #[test]
    fn zigzag_wrappers() {
        assert_eq!(vec![0x00], encode_to_vec(&Sint32(0)));
        assert_eq!(vec![0x01], encode_to_vec(&Sint32(-1)));
        assert_eq!(vec![0x02], encode_to_vec(&Sint32(1)));
        assert_eq!(
            vec![0xfe, 0xff, 0xff, 0xff, 0x0f],
            encode_to_vec(&Sint32(i32::MAX))
        );
        assert_eq!(
            vec![0xff, 0xff, 0xff, 0xff, 0x0f],
            encode_to_vec(&Sint32(i32::MIN))
        );
        assert_eq!(
            vec![0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01],
            encode_to_vec(&Sint64(i64::MIN))
        );

        assert_eq!(Sint32(99), parse::<Sint32>(&[0xc6, 0x01]).unwrap());
        assert_eq!(Sint64(-1), parse::<Sint64>(&[0x01]).unwrap());
    }

    #[test]
    fn fixed_width_values() {
        assert_eq!(vec![0x39, 0x05, 0x00, 0x00], encode_to_vec(&Fixed32(1337)));
        assert_eq!(vec![0xff, 0xff, 0xff, 0xff], encode_to_vec(&Sfixed32(-1)));
        assert_eq!(
            vec![0x85, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff],
            encode_to_vec(&Sfixed64(-123))
        );
        assert_eq!(vec![0xc3, 0xf5, 0x48, 0x40], encode_to_vec(&3.14f32));
        assert_eq!(
            vec![0x58, 0x39, 0xb4, 0xc8, 0x76, 0xbe, 0x05, 0x40],
            encode_to_vec(&2.718f64)
        );

        assert_eq!(Fixed64(1337), parse::<Fixed64>(&[0x39, 0x05, 0, 0, 0, 0, 0, 0]).unwrap());
        assert_eq!(-1.0f32, parse::<f32>(&[0x00, 0x00, 0x80, 0xbf]).unwrap());
    }

    #[test]
    fn strings() {
        assert_eq!(vec![0x00], encode_to_vec(&String::new()));
        assert_eq!(b"\x04yarn".to_vec(), encode_to_vec(&"yarn".to_owned()));

        let long = "*".repeat(128);
        let encoded = encode_to_vec(&long);
        assert_eq!(&[0x80, 0x01], &encoded[..2]);
        assert_eq!(2 + 128, encoded.len());

        assert_eq!("yarn", parse::<String>(b"\x04yarn").unwrap());
        assert!(parse::<String>(b"\x02a").is_err());
        assert!(parse::<String>(&[0x02, 0xff, 0xfe]).is_err());
    }

    #[test]
    fn bytes_accept_any_payload() {
        let blob = Bytes::new(vec![0xff, 0x00, 0xfe]);
        assert_eq!(vec![0x03, 0xff, 0x00, 0xfe], encode_to_vec(&blob));
        assert_eq!(blob, parse::<Bytes>(&[0x03, 0xff, 0x00, 0xfe]).unwrap());
    }

    #[test]
    fn views_borrow_from_the_buffer() {
        let wire = b"\x07sunsets";
        let mut view = ByteView::null();
        let mut dec = Decoder::new(wire);
        view.merge(&mut dec, 0).unwrap();
        assert_eq!(Some("sunsets"), view.as_str());
        // The view aliases the wire buffer rather than copying.
        assert!(std::ptr::eq(view.as_bytes().unwrap().as_ptr(), wire[1..].as_ptr()));
    }

    #[test]
    fn oversized_length_prefix_is_rejected() {
        assert_eq!(OVERSIZE_SENTINEL, len_prefixed_size(MAX_SERIALIZED_SIZE as usize));
        assert_eq!(
            MAX_SERIALIZED_SIZE as i64,
            len_prefixed_size((MAX_SERIALIZED_SIZE - 4) as usize)
        );
    }
}
