//! The keyed-pair facade: a map entry viewed, for wire purposes, as a
//! two-field message.
//!
//! ```text
//! message MapFieldEntry {
//!     key_type key = 1;
//!     value_type value = 2;
//! }
//! ```
//!
//! Map containers serialize as repeated entries of this shape, one
//! length-delimited record per pair. Each entry counts as one nesting level,
//! exactly like an ordinary nested message.

use crate::codec::limits::MAX_MESSAGE_NESTING_DEPTH;
use crate::codec::rules::{encode_single_field, merge_single_field, single_field_size};
use crate::codec::tag::{field_number_from_tag, make_tag, tag_size, wire_type_from_tag};
use crate::codec::types::{Bytes, Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64};
use crate::codec::value::Value;
use crate::codec::wire::{varint_size, Decoder, Encoder, WireType};
use crate::error::DecodeError;

/// Field number of the key inside an entry
pub const KEY_FIELD_NUMBER: i32 = 1;
/// Field number of the value inside an entry
pub const VALUE_FIELD_NUMBER: i32 = 2;

mod sealed {
    pub trait Sealed {}
}

/// Marker for types allowed in the key position of a map field
///
/// Keys may be any integer kind (plain, ZigZag-wrapped, or fixed-width)
/// plus `bool` and `String`. Floating point values and enumerations are
/// not keys.
pub trait MapKey: sealed::Sealed {}

macro_rules! map_key {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl MapKey for $ty {}
        )+
    };
}

map_key!(u32, u64, i32, i64, bool, Sint32, Sint64, Fixed32, Fixed64, Sfixed32, Sfixed64, String, Bytes);

/// Encoded size of an entry's two-field payload, length prefix excluded
pub(crate) fn entry_payload_size<'b, K, V>(key: &K, value: &V, depth: u32) -> i64
where
    K: Value<'b>,
    V: Value<'b>,
{
    single_field_size(key, KEY_FIELD_NUMBER, depth)
        + single_field_size(value, VALUE_FIELD_NUMBER, depth)
}

/// Total wire size of one entry under its repeated-field tag
pub(crate) fn entry_field_size<'b, K, V>(key: &K, value: &V, field_number: i32, depth: u32) -> i64
where
    K: Value<'b>,
    V: Value<'b>,
{
    let payload = entry_payload_size(key, value, depth);
    tag_size(field_number, WireType::Len) + varint_size(payload as u32 as u64) as i64 + payload
}

/// Emits one entry: repeated-field tag, entry length, then the key and
/// value records
pub(crate) fn encode_entry_field<'b, K, V>(
    key: &K,
    value: &V,
    field_number: i32,
    enc: &mut Encoder<'_>,
) where
    K: Value<'b>,
    V: Value<'b>,
{
    enc.put_varint(make_tag(field_number, WireType::Len) as u64);
    let payload = entry_payload_size(key, value, 0);
    enc.put_varint(payload as u32 as u64);
    encode_single_field(key, KEY_FIELD_NUMBER, enc);
    encode_single_field(value, VALUE_FIELD_NUMBER, enc);
}

/// Parses one entry record into a fresh `(key, value)` pair
///
/// Fields other than 1 and 2 inside the entry are skipped, and a missing
/// key or value falls back to its default, matching the compatibility
/// rules for ordinary messages.
pub(crate) fn merge_entry<'b, K, V>(
    wire_type: WireType,
    dec: &mut Decoder<'b>,
    depth: u32,
) -> Result<(K, V), DecodeError>
where
    K: Value<'b>,
    V: Value<'b>,
{
    if wire_type != WireType::Len {
        return Err(DecodeError);
    }
    let len = dec.read_length()?;
    if depth >= MAX_MESSAGE_NESTING_DEPTH {
        return Err(DecodeError);
    }
    let payload = dec.read_bytes(len)?;
    let mut sub = Decoder::new(payload);

    let mut key = K::default();
    let mut value = V::default();
    while !sub.at_end() {
        let tag = sub.read_varint32()?;
        let wire_type = wire_type_from_tag(tag)?;
        match field_number_from_tag(tag) {
            KEY_FIELD_NUMBER => merge_single_field(&mut key, wire_type, &mut sub, depth + 1)?,
            VALUE_FIELD_NUMBER => merge_single_field(&mut value, wire_type, &mut sub, depth + 1)?,
            _ => crate::codec::parse::skip_value(wire_type, &mut sub)?,
        }
    }
    Ok((key, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_bytes<'b, K: Value<'b>, V: Value<'b>>(key: &K, value: &V, number: i32) -> Vec<u8> {
        let size = entry_field_size(key, value, number, 0);
        let mut buf = vec![0u8; size as usize];
        let mut enc = Encoder::new(&mut buf);
        encode_entry_field(key, value, number, &mut enc);
        assert_eq!(size as usize, enc.position());
        buf
    }

    #[test]
    fn string_to_int_entry() {
        assert_eq!(
            b"\x0a\x09\x0a\x05alice\x10\x1c".to_vec(),
            entry_bytes(&"alice".to_owned(), &28i32, 1)
        );
    }

    #[test]
    fn int_to_int_entry() {
        assert_eq!(
            vec![0x0a, 0x04, 0x08, 0x01, 0x10, 0x02],
            entry_bytes(&1i32, &2i32, 1)
        );
    }

    #[test]
    fn entry_round_trip() {
        let wire = entry_bytes(&"bob".to_owned(), &27i32, 3);
        let mut dec = Decoder::new(&wire);
        let tag = dec.read_varint32().unwrap();
        assert_eq!(3, field_number_from_tag(tag));
        let (key, value): (String, i32) =
            merge_entry(wire_type_from_tag(tag).unwrap(), &mut dec, 0).unwrap();
        assert_eq!("bob", key);
        assert_eq!(27, value);
        assert!(dec.at_end());
    }

    #[test]
    fn missing_entry_fields_default() {
        // An empty entry payload yields default key and value.
        let mut dec = Decoder::new(&[0x00]);
        let (key, value): (i32, String) = merge_entry(WireType::Len, &mut dec, 0).unwrap();
        assert_eq!(0, key);
        assert_eq!("", value);
    }

    #[test]
    fn unknown_entry_fields_are_skipped() {
        // Entry holding key=1, an unknown field 3, and value=2.
        let wire = [0x06, 0x08, 0x07, 0x18, 0x63, 0x10, 0x05];
        let mut dec = Decoder::new(&wire);
        let (key, value): (i32, i32) = merge_entry(WireType::Len, &mut dec, 0).unwrap();
        assert_eq!(7, key);
        assert_eq!(5, value);
    }

    #[test]
    fn entry_rejects_wrong_outer_wire_type() {
        let mut dec = Decoder::new(&[0x00]);
        assert!(merge_entry::<i32, i32>(WireType::Varint, &mut dec, 0).is_err());
    }
}
