//! Tag composition: the varint prefix that carries a field number and wire
//! type ahead of every value on the wire.

use crate::codec::wire::{varint_size, WireType};
use crate::error::DecodeError;

/// A decoded tag: 29 bits of field number over 3 bits of wire type
pub type Tag = u32;

/// Number of low bits a tag reserves for the wire type
pub const WIRE_TYPE_BITS: u32 = 3;

/// Packs `field_number` and `wire_type` into a [`Tag`]
#[must_use]
pub const fn make_tag(field_number: i32, wire_type: WireType) -> Tag {
    ((field_number as Tag) << WIRE_TYPE_BITS) | wire_type as Tag
}

/// Extracts the field number from a [`Tag`]
#[must_use]
pub const fn field_number_from_tag(tag: Tag) -> i32 {
    (tag >> WIRE_TYPE_BITS) as i32
}

/// Extracts the wire type from a [`Tag`], failing on the reserved codes
/// 6 and 7
pub fn wire_type_from_tag(tag: Tag) -> Result<WireType, DecodeError> {
    WireType::try_from((tag & ((1 << WIRE_TYPE_BITS) - 1)) as u8)
}

/// Number of wire bytes the tag for `field_number` at `wire_type` occupies
#[must_use]
pub const fn tag_size(field_number: i32, wire_type: WireType) -> i64 {
    varint_size(make_tag(field_number, wire_type) as u64) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::limits::MAX_FIELD_NUMBER;

    #[test]
    fn pack_and_unpack() {
        let tag = make_tag(1, WireType::Varint);
        assert_eq!(0x08, tag);
        assert_eq!(1, field_number_from_tag(tag));
        assert_eq!(WireType::Varint, wire_type_from_tag(tag).unwrap());

        let tag = make_tag(12, WireType::Len);
        assert_eq!(0x62, tag);
        assert_eq!(12, field_number_from_tag(tag));
        assert_eq!(WireType::Len, wire_type_from_tag(tag).unwrap());

        let tag = make_tag(MAX_FIELD_NUMBER, WireType::I32);
        assert_eq!(MAX_FIELD_NUMBER, field_number_from_tag(tag));
        assert_eq!(WireType::I32, wire_type_from_tag(tag).unwrap());
    }

    #[test]
    fn reserved_wire_types_fail() {
        assert!(wire_type_from_tag(0x06).is_err());
        assert!(wire_type_from_tag(0x07).is_err());
    }

    #[test]
    fn sizes_grow_with_field_number() {
        assert_eq!(1, tag_size(1, WireType::Varint));
        assert_eq!(1, tag_size(15, WireType::Len));
        assert_eq!(2, tag_size(16, WireType::Len));
        assert_eq!(3, tag_size(2048, WireType::Varint));
        assert_eq!(5, tag_size(MAX_FIELD_NUMBER, WireType::Varint));
    }
}
