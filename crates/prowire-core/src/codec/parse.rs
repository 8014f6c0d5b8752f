//! Parse engine: walks wire bytes as a sequence of tag+value records and
//! routes each one into a message.
//!
//! Failure is a single bit by design: either the parse consumed exactly the
//! stated range, or it did not. Reasons include a premature end of buffer,
//! a legacy or reserved wire type, a length past the payload ceiling or the
//! remaining range, and nesting beyond the depth limit. No taxonomy is
//! surfaced: wire bytes are either trustworthy or they are not. On
//! failure the destination message may be partially mutated; callers that
//! need transactional behavior parse into a fresh message and swap.

use crate::codec::message::Message;
use crate::codec::tag::{field_number_from_tag, wire_type_from_tag};
use crate::codec::wire::{Decoder, WireType};
use crate::error::DecodeError;

/// Parses `bytes`, merging field data into `message`
///
/// Merge semantics: repeated fields append, singular fields present in the
/// bytes overwrite, and fields absent from the bytes are left untouched.
/// Unknown field numbers are skipped, which is what keeps old message
/// definitions compatible with bytes written by newer ones.
pub fn merge<'b, M: Message<'b>>(bytes: &'b [u8], message: &mut M) -> Result<(), DecodeError> {
    parse_fields(&mut Decoder::new(bytes), message, 0)
}

/// Parses `bytes` into a freshly constructed message
pub fn decode<'b, M: Message<'b>>(bytes: &'b [u8]) -> Result<M, DecodeError> {
    let mut message = M::default();
    merge(bytes, &mut message)?;
    Ok(message)
}

/// Walks `dec` to its end as tag+value records, dispatching each to
/// `message`
///
/// `depth` is the current message nesting level.
pub fn parse_fields<'b, M: Message<'b>>(
    dec: &mut Decoder<'b>,
    message: &mut M,
    depth: u32,
) -> Result<(), DecodeError> {
    while !dec.at_end() {
        let tag = dec.read_varint32()?;
        let wire_type = wire_type_from_tag(tag)?;
        message.merge_field(field_number_from_tag(tag), wire_type, dec, depth)?;
    }
    Ok(())
}

/// Consumes the value bytes of an unknown field according to its wire type
///
/// The legacy group markers carry no length and cannot be skipped; they
/// fail the parse, as do the reserved wire types (which already fail tag
/// decoding).
pub fn skip_value(wire_type: WireType, dec: &mut Decoder<'_>) -> Result<(), DecodeError> {
    match wire_type {
        WireType::Varint => {
            dec.read_varint()?;
            Ok(())
        }
        WireType::I64 => dec.skip(8),
        WireType::Len => {
            let len = dec.read_length()?;
            dec.skip(len)
        }
        WireType::I32 => dec.skip(4),
        WireType::StartGroup | WireType::EndGroup => Err(DecodeError),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::limits::MAX_MESSAGE_NESTING_DEPTH;
    use crate::codec::types::{Boxed, ByteView, Fixed32, Sfixed64, Sint32};
    use crate::{wire_enum, wire_message};
    use std::collections::BTreeMap;

    #[derive(Debug, Default, PartialEq)]
    struct Nested {
        a_string: String,
        an_int: i32,
    }

    wire_message!(Nested {
        1 => a_string,
        2 => an_int,
    });

    wire_enum! {
        enum Knob {
            High = 128,
            Low = 20,
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Everything<'a> {
        an_uint64: u64,
        an_int32: i32,
        a_sint32: Sint32,
        a_bool: bool,
        an_enum: Knob,
        a_double: f64,
        a_float: f32,
        a_sfixed64: Sfixed64,
        a_fixed32: Fixed32,
        a_string: String,
        a_view: ByteView<'a>,
        nested: Nested,
        nested_ptr: Boxed<Nested>,
        opt_float: Option<f32>,
        opt_nested: Option<Nested>,
    }

    wire_message!(Everything<'a> {
        1 => an_uint64,
        2 => an_int32,
        3 => a_sint32,
        4 => a_bool,
        5 => an_enum,
        6 => a_double,
        7 => a_float,
        8 => a_sfixed64,
        9 => a_fixed32,
        10 => a_string,
        11 => a_view,
        12 => nested,
        13 => nested_ptr,
        16 => opt_float,
        19 => opt_nested,
    });

    // Wire image of the fully-populated Everything message, length prefix
    // included, as written by the serializer (and by any conforming one).
    const EVERYTHING_WIRE: &[u8] = b"\x5c\
        \x08\x84\xbf\xda\x04\
        \x10\xf5\x96\x30\
        \x18\xc6\x01\
        \x20\x01\
        \x28\x80\x01\
        \x31\x58\x39\xb4\xc8\x76\xbe\x05\x40\
        \x3d\xc3\xf5\x48\x40\
        \x41\x85\xff\xff\xff\xff\xff\xff\xff\
        \x4d\xc8\x01\x00\x00\
        \x52\x04yarn\
        \x5a\x07sunsets\
        \x62\x0b\x0a\x07kittens\x10\x00\
        \x6a\x04\x0a\x00\x10\x00\
        \x85\x01\x00\x24\x74\x49\
        \x9a\x01\x04\x0a\x00\x10\x00";

    fn everything() -> Everything<'static> {
        Everything {
            an_uint64: 9_871_236,
            an_int32: 789_365,
            a_sint32: Sint32(99),
            a_bool: true,
            an_enum: Knob::High,
            a_double: 2.718,
            a_float: 3.14,
            a_sfixed64: Sfixed64(-123),
            a_fixed32: Fixed32(456),
            a_string: "yarn".to_owned(),
            a_view: ByteView::from("sunsets"),
            nested: Nested {
                a_string: "kittens".to_owned(),
                an_int: 0,
            },
            nested_ptr: Boxed::new(Nested::default()),
            opt_float: Some(1.0e6),
            opt_nested: Some(Nested::default()),
        }
    }

    #[test]
    fn parses_every_field_kind() {
        // The outer length prefix belongs to the nested-message form; the
        // merge entry points take the bare field bytes.
        let fields = &EVERYTHING_WIRE[1..];
        let message: Everything<'_> = decode(fields).unwrap();

        let expected = everything();
        assert_eq!(expected.an_uint64, message.an_uint64);
        assert_eq!(expected.an_int32, message.an_int32);
        assert_eq!(expected.a_sint32, message.a_sint32);
        assert_eq!(expected.a_bool, message.a_bool);
        assert_eq!(expected.an_enum, message.an_enum);
        assert_eq!(expected.a_double, message.a_double);
        assert_eq!(expected.a_float, message.a_float);
        assert_eq!(expected.a_sfixed64, message.a_sfixed64);
        assert_eq!(expected.a_fixed32, message.a_fixed32);
        assert_eq!(expected.a_string, message.a_string);
        assert_eq!(Some("sunsets"), message.a_view.as_str());
        assert_eq!(expected.nested, message.nested);
        assert_eq!(Some(&Nested::default()), message.nested_ptr.get());
        assert_eq!(Some(1.0e6), message.opt_float);
        assert_eq!(Some(Nested::default()), message.opt_nested);

        assert!(decode::<Everything<'_>>(b"").is_ok());
    }

    #[test]
    fn empty_bytes_leave_wrappers_absent() {
        let message: Everything<'_> = decode(b"").unwrap();
        assert!(message.a_view.is_null());
        assert!(!message.nested_ptr.is_present());
        assert_eq!(None, message.opt_float);
        assert_eq!(None, message.opt_nested);
    }

    #[test]
    fn singular_fields_overwrite_and_absent_fields_survive() {
        let mut message = Nested {
            a_string: "original".to_owned(),
            an_int: 5,
        };
        // Only field 1 present.
        merge(b"\x0a\x03new", &mut message).unwrap();
        assert_eq!("new", message.a_string);
        assert_eq!(5, message.an_int);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        #[derive(Debug, Default, PartialEq)]
        struct V1 {
            an_int: i32,
        }
        wire_message!(V1 { 1 => an_int });

        #[derive(Debug, Default, PartialEq)]
        struct V2 {
            an_int: i32,
            a_string: Option<String>,
        }
        wire_message!(V2 {
            1 => an_int,
            2 => a_string,
        });

        let v2_wire = b"\x08\x01\x12\x03abc";
        let old: V1 = decode(v2_wire).unwrap();
        assert_eq!(1, old.an_int);

        let v1_wire = b"\x08\x10";
        let new: V2 = decode(v1_wire).unwrap();
        assert_eq!(16, new.an_int);
        assert_eq!(None, new.a_string);
    }

    #[test]
    fn singular_string_accepts_the_last_of_repeats() {
        #[derive(Debug, Default, PartialEq)]
        struct OneString {
            s: Option<String>,
        }
        wire_message!(OneString { 1 => s });

        #[derive(Debug, Default, PartialEq)]
        struct ManyStrings {
            s: Vec<String>,
        }
        wire_message!(ManyStrings { 1 => s });

        let repeated_wire = b"\x0a\x03abc\x0a\x03def\x0a\x03ghi";
        let narrowed: OneString = decode(repeated_wire).unwrap();
        assert_eq!(Some("ghi".to_owned()), narrowed.s);

        let single_wire = b"\x0a\x03abc";
        let widened: ManyStrings = decode(single_wire).unwrap();
        assert_eq!(vec!["abc".to_owned()], widened.s);
    }

    #[test]
    fn wrong_wire_type_fails() {
        // Field 1 of Nested is a string; a varint record under its number
        // is a declaration mismatch.
        let mut message = Nested::default();
        assert!(merge(b"\x08\x05", &mut message).is_err());
    }

    #[test]
    fn group_wire_types_fail() {
        let mut message = Nested::default();
        // Unknown field 7, wire type 3 (start group).
        assert!(merge(b"\x3b", &mut message).is_err());
        // Unknown field 7, wire type 4 (end group).
        assert!(merge(b"\x3c", &mut message).is_err());
        // Reserved wire type 7 fails at tag decoding.
        assert!(merge(b"\x3f", &mut message).is_err());
    }

    #[test]
    fn truncated_records_fail_without_overrun() {
        let mut message = Nested::default();
        assert!(merge(b"\x0a\x05ab", &mut message).is_err());
        assert!(merge(b"\x10\x80", &mut message).is_err());
        assert!(merge(b"\x0a", &mut message).is_err());
    }

    #[test]
    fn big_field_numbers_dispatch() {
        #[derive(Debug, Default, PartialEq)]
        struct Wide {
            alice: i32,
            bob: i32,
            charlie: i32,
        }
        wire_message!(Wide {
            1 => alice,
            2048 => bob,
            536870911 => charlie,
        });

        let wire = b"\x08\x01\x80\x80\x01\x02\xf8\xff\xff\xff\x0f\x03";
        let message: Wide = decode(wire).unwrap();
        assert_eq!((1, 2, 3), (message.alice, message.bob, message.charlie));
    }

    #[test]
    fn maps_merge_entry_records() {
        #[derive(Debug, Default, PartialEq)]
        struct Registration {
            student_ages: BTreeMap<String, i32>,
        }
        wire_message!(Registration { 1 => student_ages });

        let wire = b"\x0a\x09\x0a\x05alice\x10\x1c\
                     \x0a\x07\x0a\x03bob\x10\x1b\
                     \x0a\x0c\x0a\x07charlie\x10\xd3\x01";
        let message: Registration = decode(wire).unwrap();
        assert_eq!(3, message.student_ages.len());
        assert_eq!(Some(&28), message.student_ages.get("alice"));
        assert_eq!(Some(&27), message.student_ages.get("bob"));
        assert_eq!(Some(&211), message.student_ages.get("charlie"));
    }

    fn nesting_chain(depth: usize) -> Vec<u8> {
        // Innermost record is empty; each wrap adds field 1 as a
        // length-delimited value.
        let mut wire: Vec<u8> = Vec::new();
        for _ in 0..depth {
            let mut outer = Vec::with_capacity(wire.len() + 3);
            outer.push(0x0a);
            let len = wire.len();
            if len < 128 {
                outer.push(len as u8);
            } else {
                assert!(len < 128 * 128);
                outer.push(0x80 | (len & 0x7f) as u8);
                outer.push((len >> 7) as u8);
            }
            outer.extend_from_slice(&wire);
            wire = outer;
        }
        wire
    }

    #[derive(Debug, Default, PartialEq)]
    struct Chain {
        next: Boxed<Chain>,
    }
    wire_message!(Chain { 1 => next });

    fn chain_depth(outermost: &Chain) -> usize {
        let mut count = 0;
        let mut node = outermost;
        while let Some(next) = node.next.get() {
            count += 1;
            node = next;
        }
        count
    }

    #[test]
    fn nesting_depth_is_bounded() {
        for depth in [1, 50, MAX_MESSAGE_NESTING_DEPTH as usize] {
            let wire = nesting_chain(depth);
            let message: Chain = decode(&wire).unwrap();
            assert_eq!(depth, chain_depth(&message), "depth {depth}");
        }
        for depth in [
            MAX_MESSAGE_NESTING_DEPTH as usize + 1,
            MAX_MESSAGE_NESTING_DEPTH as usize + 2,
            MAX_MESSAGE_NESTING_DEPTH as usize + 3,
        ] {
            let wire = nesting_chain(depth);
            assert!(decode::<Chain>(&wire).is_err(), "depth {depth}");
        }
    }

    #[test]
    fn skip_handles_every_skippable_wire_type() {
        let mut dec = Decoder::new(&[0x96, 0x01]);
        skip_value(WireType::Varint, &mut dec).unwrap();
        assert!(dec.at_end());

        let mut dec = Decoder::new(&[0u8; 8]);
        skip_value(WireType::I64, &mut dec).unwrap();
        assert!(dec.at_end());

        let mut dec = Decoder::new(b"\x03abc");
        skip_value(WireType::Len, &mut dec).unwrap();
        assert!(dec.at_end());

        let mut dec = Decoder::new(&[0u8; 4]);
        skip_value(WireType::I32, &mut dec).unwrap();
        assert!(dec.at_end());

        let mut dec = Decoder::new(&[0u8; 2]);
        assert!(skip_value(WireType::I64, &mut dec).is_err());
        let mut dec = Decoder::new(b"\x05ab");
        assert!(skip_value(WireType::Len, &mut dec).is_err());
        let mut dec = Decoder::new(&[]);
        assert!(skip_value(WireType::StartGroup, &mut dec).is_err());
    }
}
