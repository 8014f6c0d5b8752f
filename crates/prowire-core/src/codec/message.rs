//! The [`Message`] trait and the declaration macros.
//!
//! A message is an ordinary struct plus an ordered field list declared with
//! [`wire_message!`](crate::wire_message). The macro generates the
//! per-field fold for sizing and emission, the field-number dispatch used
//! during parsing, and a compile-time check that the declared numbers are
//! strictly increasing, so a mis-declared message fails to build rather
//! than mis-parsing at runtime.

use crate::codec::limits::is_valid_field_number;
use crate::codec::wire::{Decoder, Encoder, WireType};
use crate::error::DecodeError;

/// A record type with a declared wire-field layout
///
/// Implemented by [`wire_message!`](crate::wire_message); not intended for
/// manual implementation. The lifetime `'b` is the parse buffer's: messages
/// without borrowing fields implement the trait for every lifetime.
pub trait Message<'b>: Default {
    /// Declared field numbers, in declaration order
    ///
    /// The declaration order is required to be strictly increasing, which
    /// is what makes the parse-time dispatch a sorted-table search.
    const FIELD_NUMBERS: &'static [i32];

    /// Sum of the encoded sizes of all present fields, tags included
    fn size_of_fields(&self, depth: u32) -> i64;

    /// Emits all present fields in declaration order
    fn encode_fields(&self, enc: &mut Encoder<'_>);

    /// Routes one wire record to the field declared under `field_number`,
    /// or skips it when no such field exists
    fn merge_field(
        &mut self,
        field_number: i32,
        wire_type: WireType,
        dec: &mut Decoder<'b>,
        depth: u32,
    ) -> Result<(), DecodeError>;
}

/// Compile-time validation backing the `wire_message!` declaration check:
/// every number valid, and the list strictly increasing
#[must_use]
pub const fn field_numbers_strictly_increase(numbers: &[i32]) -> bool {
    let mut i = 0;
    while i < numbers.len() {
        if !is_valid_field_number(numbers[i]) {
            return false;
        }
        if i + 1 < numbers.len() && numbers[i] >= numbers[i + 1] {
            return false;
        }
        i += 1;
    }
    true
}

/// Declares the wire-field layout of a message struct
///
/// The struct itself is written as ordinary Rust (derive `Default`, `Debug`,
/// `PartialEq` as needed); this macro attaches the codec impls:
///
/// ```
/// use prowire_core::wire_message;
///
/// #[derive(Debug, Default, PartialEq)]
/// struct AudioConfig {
///     sample_rate: i32,
///     bit_depth: i32,
///     channel_count: i32,
/// }
///
/// wire_message!(AudioConfig {
///     1 => sample_rate,
///     2 => bit_depth,
///     3 => channel_count,
/// });
/// ```
///
/// Messages holding [`ByteView`](crate::ByteView) fields borrow from the
/// parse buffer and declare the lifetime:
///
/// ```
/// use prowire_core::{wire_message, ByteView};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Packet<'a> {
///     kind: u32,
///     body: ByteView<'a>,
/// }
///
/// wire_message!(Packet<'a> {
///     1 => kind,
///     2 => body,
/// });
/// ```
///
/// Field numbers must be strictly increasing, within `1..=2^29-1`, and
/// outside the reserved `19000..=19999` window; violations are compile
/// errors.
#[macro_export]
macro_rules! wire_message {
    ($name:ident { $($number:literal => $field:ident),* $(,)? }) => {
        $crate::__wire_message_impls!(['b] [$name] [$name] $($number => $field),*);
    };
    ($name:ident < $lt:lifetime > { $($number:literal => $field:ident),* $(,)? }) => {
        $crate::__wire_message_impls!([$lt] [$name<$lt>] [$name<'static>] $($number => $field),*);
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_message_impls {
    ([$lt:lifetime] [$($selfty:tt)+] [$($staticty:tt)+] $($number:literal => $field:ident),*) => {
        impl<$lt> $crate::codec::message::Message<$lt> for $($selfty)+ {
            const FIELD_NUMBERS: &'static [i32] = &[$($number),*];

            fn size_of_fields(&self, depth: u32) -> i64 {
                let _ = depth;
                let total: i64 = 0;
                $(
                    let total = total
                        + $crate::codec::rules::FieldRule::field_size(
                            &self.$field,
                            $number,
                            depth,
                        );
                )*
                total
            }

            fn encode_fields(&self, enc: &mut $crate::codec::wire::Encoder<'_>) {
                let _ = &enc;
                $(
                    $crate::codec::rules::FieldRule::encode_field(&self.$field, $number, enc);
                )*
            }

            fn merge_field(
                &mut self,
                field_number: i32,
                wire_type: $crate::codec::wire::WireType,
                dec: &mut $crate::codec::wire::Decoder<$lt>,
                depth: u32,
            ) -> ::core::result::Result<(), $crate::error::DecodeError> {
                let _ = depth;
                match field_number {
                    $(
                        $number => $crate::codec::rules::FieldRule::merge_field(
                            &mut self.$field,
                            wire_type,
                            dec,
                            depth,
                        ),
                    )*
                    _ => $crate::codec::parse::skip_value(wire_type, dec),
                }
            }
        }

        const _: () = ::core::assert!(
            $crate::codec::message::field_numbers_strictly_increase(
                <$($staticty)+ as $crate::codec::message::Message<'static>>::FIELD_NUMBERS,
            ),
            "wire_message! field numbers must be valid and strictly increasing",
        );

        impl<$lt> $crate::codec::value::Value<$lt> for $($selfty)+ {
            const WIRE_TYPE: $crate::codec::wire::WireType = $crate::codec::wire::WireType::Len;

            fn encoded_size(&self, depth: u32) -> i64 {
                if depth >= $crate::codec::limits::MAX_MESSAGE_NESTING_DEPTH {
                    return $crate::codec::limits::OVERDEPTH_SENTINEL;
                }
                let payload =
                    $crate::codec::message::Message::size_of_fields(self, depth + 1);
                $crate::codec::wire::varint_size(payload as u32 as u64) as i64 + payload
            }

            fn encode(&self, enc: &mut $crate::codec::wire::Encoder<'_>) {
                let payload = $crate::codec::message::Message::size_of_fields(self, 0);
                enc.put_varint(payload as u32 as u64);
                $crate::codec::message::Message::encode_fields(self, enc);
            }

            fn merge(
                &mut self,
                dec: &mut $crate::codec::wire::Decoder<$lt>,
                depth: u32,
            ) -> ::core::result::Result<(), $crate::error::DecodeError> {
                let len = dec.read_length()?;
                if depth >= $crate::codec::limits::MAX_MESSAGE_NESTING_DEPTH {
                    return ::core::result::Result::Err($crate::error::DecodeError);
                }
                let payload = dec.read_bytes(len)?;
                $crate::codec::parse::parse_fields(
                    &mut $crate::codec::wire::Decoder::new(payload),
                    self,
                    depth + 1,
                )
            }
        }

        impl<$lt> $crate::codec::rules::FieldRule<$lt> for $($selfty)+ {
            fn field_size(&self, field_number: i32, depth: u32) -> i64 {
                $crate::codec::rules::single_field_size(self, field_number, depth)
            }

            fn encode_field(
                &self,
                field_number: i32,
                enc: &mut $crate::codec::wire::Encoder<'_>,
            ) {
                $crate::codec::rules::encode_single_field(self, field_number, enc);
            }

            fn merge_field(
                &mut self,
                wire_type: $crate::codec::wire::WireType,
                dec: &mut $crate::codec::wire::Decoder<$lt>,
                depth: u32,
            ) -> ::core::result::Result<(), $crate::error::DecodeError> {
                $crate::codec::rules::merge_single_field(self, wire_type, dec, depth)
            }
        }
    };
}

/// Declares an enumeration serialized as a varint over its `i32` raw value
///
/// The first variant doubles as the default, and raw wire values that match
/// no declared variant fold to it on parse; unknown enumerators are never
/// a parse error. Declare an explicit catch-all variant where that
/// distinction matters.
///
/// ```
/// use prowire_core::wire_enum;
///
/// wire_enum! {
///     /// Playback state advertised by a peer.
///     pub enum Playback {
///         Stopped = 0,
///         Playing = 1,
///         Paused = 2,
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(i32)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl ::core::default::Default for $name {
            fn default() -> Self {
                $crate::__wire_enum_first!($name; $($variant),+)
            }
        }

        impl $name {
            /// Raw varint representation of this enumerator
            #[must_use]
            $vis fn to_raw(self) -> i32 {
                self as i32
            }

            /// Maps a raw wire value to an enumerator; unknown values fold
            /// to the default variant
            #[must_use]
            $vis fn from_raw(raw: i32) -> Self {
                match raw {
                    $($value => Self::$variant,)+
                    _ => <Self as ::core::default::Default>::default(),
                }
            }
        }

        impl<'b> $crate::codec::value::Value<'b> for $name {
            const WIRE_TYPE: $crate::codec::wire::WireType =
                $crate::codec::wire::WireType::Varint;

            fn encoded_size(&self, _depth: u32) -> i64 {
                $crate::codec::wire::signed_varint_size(self.to_raw() as i64) as i64
            }

            fn encode(&self, enc: &mut $crate::codec::wire::Encoder<'_>) {
                enc.put_signed_varint(self.to_raw() as i64);
            }

            fn merge(
                &mut self,
                dec: &mut $crate::codec::wire::Decoder<'b>,
                _depth: u32,
            ) -> ::core::result::Result<(), $crate::error::DecodeError> {
                *self = Self::from_raw(dec.read_varint()? as i32);
                ::core::result::Result::Ok(())
            }
        }

        impl<'b> $crate::codec::rules::FieldRule<'b> for $name {
            fn field_size(&self, field_number: i32, depth: u32) -> i64 {
                $crate::codec::rules::single_field_size(self, field_number, depth)
            }

            fn encode_field(
                &self,
                field_number: i32,
                enc: &mut $crate::codec::wire::Encoder<'_>,
            ) {
                $crate::codec::rules::encode_single_field(self, field_number, enc);
            }

            fn merge_field(
                &mut self,
                wire_type: $crate::codec::wire::WireType,
                dec: &mut $crate::codec::wire::Decoder<'b>,
                depth: u32,
            ) -> ::core::result::Result<(), $crate::error::DecodeError> {
                $crate::codec::rules::merge_single_field(self, wire_type, dec, depth)
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_enum_first {
    ($name:ident; $first:ident $(, $rest:ident)*) => {
        $name::$first
    };
}
