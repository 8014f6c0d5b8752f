//! Field rules: how a declared struct member turns into zero, one, or many
//! tag+value records on the wire.
//!
//! Every field position implements [`FieldRule`]. Plain members are always
//! present; `Option` and [`Boxed`] introduce presence; the standard
//! sequence and set containers become repeated fields; maps become repeated
//! keyed-pair entries (see [`crate::codec::map_entry`]).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::Hash;

use crate::codec::map_entry::{self, MapKey};
use crate::codec::tag::{make_tag, tag_size};
use crate::codec::types::{Boxed, ByteView, Bytes, Fixed32, Fixed64, Sfixed32, Sfixed64, Sint32, Sint64};
use crate::codec::value::Value;
use crate::codec::wire::{varint_size, Decoder, Encoder, WireType};
use crate::error::DecodeError;

/// Wire behavior of one declared field, tag emission included
pub trait FieldRule<'b> {
    /// Total encoded size this field contributes, tags included; 0 when the
    /// field is absent
    fn field_size(&self, field_number: i32, depth: u32) -> i64;

    /// Emits the field's tag+value records, or nothing when absent
    fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>);

    /// Absorbs one wire record addressed to this field
    ///
    /// Called once per matching tag; repeated fields append, singular
    /// fields overwrite.
    fn merge_field(
        &mut self,
        wire_type: WireType,
        dec: &mut Decoder<'b>,
        depth: u32,
    ) -> Result<(), DecodeError>;
}

/// True for element wire types eligible for the packed-repeated encoding
///
/// Length-delimited elements (strings, bytes, messages, map entries) never
/// pack.
#[must_use]
pub const fn is_packable(wire_type: WireType) -> bool {
    matches!(wire_type, WireType::Varint | WireType::I64 | WireType::I32)
}

/// Size of a present single value: its tag plus the value itself
pub fn single_field_size<'b, V: Value<'b>>(value: &V, field_number: i32, depth: u32) -> i64 {
    tag_size(field_number, V::WIRE_TYPE) + value.encoded_size(depth)
}

/// Emits one tag+value record
pub fn encode_single_field<'b, V: Value<'b>>(value: &V, field_number: i32, enc: &mut Encoder<'_>) {
    enc.put_varint(make_tag(field_number, V::WIRE_TYPE) as u64);
    value.encode(enc);
}

/// Parses one value into `value` after checking the wire type matches the
/// declaration
pub fn merge_single_field<'b, V: Value<'b>>(
    value: &mut V,
    wire_type: WireType,
    dec: &mut Decoder<'b>,
    depth: u32,
) -> Result<(), DecodeError> {
    if wire_type != V::WIRE_TYPE {
        return Err(DecodeError);
    }
    value.merge(dec, depth)
}

macro_rules! always_present_field {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl<'b> FieldRule<'b> for $ty {
                fn field_size(&self, field_number: i32, depth: u32) -> i64 {
                    single_field_size(self, field_number, depth)
                }

                fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>) {
                    encode_single_field(self, field_number, enc);
                }

                fn merge_field(
                    &mut self,
                    wire_type: WireType,
                    dec: &mut Decoder<'b>,
                    depth: u32,
                ) -> Result<(), DecodeError> {
                    merge_single_field(self, wire_type, dec, depth)
                }
            }
        )+
    };
}

always_present_field!(
    u32, u64, i32, i64, bool, f32, f64, Sint32, Sint64, Fixed32, Fixed64, Sfixed32, Sfixed64,
    String, Bytes,
);

impl<'b, V: Value<'b>> FieldRule<'b> for Option<V> {
    fn field_size(&self, field_number: i32, depth: u32) -> i64 {
        match self {
            Some(value) => single_field_size(value, field_number, depth),
            None => 0,
        }
    }

    fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>) {
        if let Some(value) = self {
            encode_single_field(value, field_number, enc);
        }
    }

    fn merge_field(
        &mut self,
        wire_type: WireType,
        dec: &mut Decoder<'b>,
        depth: u32,
    ) -> Result<(), DecodeError> {
        if wire_type != V::WIRE_TYPE {
            return Err(DecodeError);
        }
        self.get_or_insert_with(V::default).merge(dec, depth)
    }
}

impl<'b, M: Value<'b>> FieldRule<'b> for Boxed<M> {
    fn field_size(&self, field_number: i32, depth: u32) -> i64 {
        match self.get() {
            Some(message) => single_field_size(message, field_number, depth),
            None => 0,
        }
    }

    fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>) {
        if let Some(message) = self.get() {
            encode_single_field(message, field_number, enc);
        }
    }

    fn merge_field(
        &mut self,
        wire_type: WireType,
        dec: &mut Decoder<'b>,
        depth: u32,
    ) -> Result<(), DecodeError> {
        if wire_type != M::WIRE_TYPE {
            return Err(DecodeError);
        }
        self.get_or_insert_default().merge(dec, depth)
    }
}

impl<'b> FieldRule<'b> for ByteView<'b> {
    fn field_size(&self, field_number: i32, depth: u32) -> i64 {
        if self.is_null() {
            0
        } else {
            single_field_size(self, field_number, depth)
        }
    }

    fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>) {
        if !self.is_null() {
            encode_single_field(self, field_number, enc);
        }
    }

    fn merge_field(
        &mut self,
        wire_type: WireType,
        dec: &mut Decoder<'b>,
        depth: u32,
    ) -> Result<(), DecodeError> {
        merge_single_field(self, wire_type, dec, depth)
    }
}

/// Total size of a repeated field: a single length-delimited envelope for
/// packable elements, or one tag per element otherwise
///
/// Empty containers contribute nothing.
pub(crate) fn repeated_size<'a, 'b, V>(
    elements: impl Iterator<Item = &'a V>,
    field_number: i32,
    depth: u32,
) -> i64
where
    V: Value<'b> + 'a,
{
    if is_packable(V::WIRE_TYPE) {
        let mut payload: i64 = 0;
        let mut occupied = false;
        for element in elements {
            occupied = true;
            payload += element.encoded_size(depth);
        }
        if !occupied {
            return 0;
        }
        tag_size(field_number, WireType::Len) + varint_size(payload as u32 as u64) as i64 + payload
    } else {
        elements
            .map(|element| tag_size(field_number, V::WIRE_TYPE) + element.encoded_size(depth))
            .sum()
    }
}

/// Emits a repeated field, choosing packed or element-wise form by the
/// element wire type
pub(crate) fn encode_repeated<'a, 'b, V, I>(elements: I, field_number: i32, enc: &mut Encoder<'_>)
where
    V: Value<'b> + 'a,
    I: Iterator<Item = &'a V> + Clone,
{
    if is_packable(V::WIRE_TYPE) {
        let mut payload: i64 = 0;
        let mut occupied = false;
        for element in elements.clone() {
            occupied = true;
            payload += element.encoded_size(0);
        }
        if !occupied {
            return;
        }
        enc.put_varint(make_tag(field_number, WireType::Len) as u64);
        enc.put_varint(payload as u32 as u64);
        for element in elements {
            element.encode(enc);
        }
    } else {
        for element in elements {
            enc.put_varint(make_tag(field_number, V::WIRE_TYPE) as u64);
            element.encode(enc);
        }
    }
}

/// Absorbs one wire record for a repeated field: either a single element
/// under the element's own wire type, or (for packable elements) a packed
/// envelope holding several
pub(crate) fn merge_repeated<'b, V, F>(
    mut append: F,
    wire_type: WireType,
    dec: &mut Decoder<'b>,
    depth: u32,
) -> Result<(), DecodeError>
where
    V: Value<'b>,
    F: FnMut(V),
{
    if wire_type == V::WIRE_TYPE {
        let mut element = V::default();
        element.merge(dec, depth)?;
        append(element);
        return Ok(());
    }
    if is_packable(V::WIRE_TYPE) && wire_type == WireType::Len {
        return merge_packed(append, dec, depth);
    }
    Err(DecodeError)
}

fn merge_packed<'b, V, F>(
    mut append: F,
    dec: &mut Decoder<'b>,
    depth: u32,
) -> Result<(), DecodeError>
where
    V: Value<'b>,
    F: FnMut(V),
{
    let len = dec.read_length()?;
    match V::WIRE_TYPE {
        WireType::I64 if len % 8 != 0 => return Err(DecodeError),
        WireType::I32 if len % 4 != 0 => return Err(DecodeError),
        _ => {}
    }
    let payload = dec.read_bytes(len)?;
    let mut sub = Decoder::new(payload);
    while !sub.at_end() {
        let mut element = V::default();
        element.merge(&mut sub, depth)?;
        append(element);
    }
    Ok(())
}

macro_rules! sequence_field {
    ($($container:ident, $append:ident $(, $bound:path)*;)+) => {
        $(
            impl<'b, V: Value<'b> $(+ $bound)*> FieldRule<'b> for $container<V> {
                fn field_size(&self, field_number: i32, depth: u32) -> i64 {
                    repeated_size(self.iter(), field_number, depth)
                }

                fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>) {
                    encode_repeated(self.iter(), field_number, enc);
                }

                fn merge_field(
                    &mut self,
                    wire_type: WireType,
                    dec: &mut Decoder<'b>,
                    depth: u32,
                ) -> Result<(), DecodeError> {
                    // Every insertion targets the logical end; sequences keep
                    // wire order, sets impose their own.
                    merge_repeated(
                        |element| {
                            self.$append(element);
                        },
                        wire_type,
                        dec,
                        depth,
                    )
                }
            }
        )+
    };
}

sequence_field! {
    Vec, push;
    VecDeque, push_back;
    BTreeSet, insert, Ord;
    HashSet, insert, Hash, Eq;
}

macro_rules! map_field {
    ($($container:ident $(, $bound:path)*;)+) => {
        $(
            impl<'b, K, V> FieldRule<'b> for $container<K, V>
            where
                K: Value<'b> + MapKey $(+ $bound)*,
                V: Value<'b>,
            {
                fn field_size(&self, field_number: i32, depth: u32) -> i64 {
                    self.iter()
                        .map(|(key, value)| {
                            map_entry::entry_field_size(key, value, field_number, depth)
                        })
                        .sum()
                }

                fn encode_field(&self, field_number: i32, enc: &mut Encoder<'_>) {
                    for (key, value) in self.iter() {
                        map_entry::encode_entry_field(key, value, field_number, enc);
                    }
                }

                fn merge_field(
                    &mut self,
                    wire_type: WireType,
                    dec: &mut Decoder<'b>,
                    depth: u32,
                ) -> Result<(), DecodeError> {
                    let (key, value) = map_entry::merge_entry(wire_type, dec, depth)?;
                    self.insert(key, value);
                    Ok(())
                }
            }
        )+
    };
}

map_field! {
    BTreeMap, Ord;
    HashMap, Hash, Eq;
}
