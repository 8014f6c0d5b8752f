//! Field storage types that select a non-default wire encoding or a
//! presence rule.
//!
//! The integer wrappers are drop-in replacements for `i32`/`i64`/`u32`/`u64`
//! struct members where serialization should use ZigZag or fixed-width
//! encoding instead of the plain varint. [`Bytes`] holds owned raw bytes,
//! [`ByteView`] borrows them out of a parse buffer, and [`Boxed`] is the
//! owning heap slot that makes self-referential messages possible.

/// A signed 32-bit integer serialized with ZigZag encoding
///
/// Use this over plain `i32` when the field is frequently negative: ZigZag
/// keeps small magnitudes small on the wire, where the plain encoding costs
/// 10 bytes for any negative value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sint32(pub i32);

/// A signed 64-bit integer serialized with ZigZag encoding
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sint64(pub i64);

/// An unsigned 32-bit integer serialized as 4 raw little-endian bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed32(pub u32);

/// An unsigned 64-bit integer serialized as 8 raw little-endian bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Fixed64(pub u64);

/// A signed 32-bit integer serialized as 4 raw little-endian bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sfixed32(pub i32);

/// A signed 64-bit integer serialized as 8 raw little-endian bytes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Sfixed64(pub i64);

macro_rules! integer_wrapper_conversions {
    ($($wrapper:ident($inner:ty)),+ $(,)?) => {
        $(
            impl From<$inner> for $wrapper {
                fn from(value: $inner) -> Self {
                    Self(value)
                }
            }

            impl From<$wrapper> for $inner {
                fn from(wrapper: $wrapper) -> Self {
                    wrapper.0
                }
            }

            impl PartialEq<$inner> for $wrapper {
                fn eq(&self, other: &$inner) -> bool {
                    self.0 == *other
                }
            }

            impl $wrapper {
                /// Returns the wrapped integer
                #[must_use]
                pub const fn value(self) -> $inner {
                    self.0
                }
            }
        )+
    };
}

integer_wrapper_conversions! {
    Sint32(i32),
    Sint64(i64),
    Fixed32(u32),
    Fixed64(u64),
    Sfixed32(i32),
    Sfixed64(i64),
}

/// An owned byte-string field
///
/// Unlike `String`, the payload is not required to be UTF-8.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    /// Wraps the given bytes
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// The payload as a slice
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

/// A byte-string field that borrows its payload
///
/// On serialize, the view's contents are copied to the wire. On parse, the
/// view is pointed at the bytes *inside the parse buffer*: no copy is made,
/// and the buffer must outlive the message.
///
/// A null view (the default) is distinct from an empty one: a null view is
/// absent at serialize time and emits nothing, while an empty view emits a
/// zero-length field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ByteView<'a>(Option<&'a [u8]>);

impl<'a> ByteView<'a> {
    /// A view with no referent; serializes as an absent field
    #[must_use]
    pub const fn null() -> Self {
        Self(None)
    }

    /// A view over the given bytes
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self(Some(bytes))
    }

    /// True when the view has no referent
    #[must_use]
    pub const fn is_null(&self) -> bool {
        self.0.is_none()
    }

    /// The referenced bytes, or `None` for a null view
    #[must_use]
    pub const fn as_bytes(&self) -> Option<&'a [u8]> {
        self.0
    }

    /// The referenced bytes as UTF-8, when they are both present and valid
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        std::str::from_utf8(self.0?).ok()
    }

    pub(crate) fn set(&mut self, bytes: &'a [u8]) {
        self.0 = Some(bytes);
    }
}

impl<'a> From<&'a [u8]> for ByteView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a str> for ByteView<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text.as_bytes())
    }
}

/// An owning heap slot for a message field
///
/// This is the field wrapper that allows a message type to contain itself:
/// the indirection keeps the struct finitely sized, and an empty slot is an
/// absent field. The parser fills an empty slot on demand the first time
/// the field appears on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Boxed<M>(Option<Box<M>>);

impl<M> Boxed<M> {
    /// An empty slot; serializes as an absent field
    #[must_use]
    pub const fn empty() -> Self {
        Self(None)
    }

    /// A slot holding `message`
    #[must_use]
    pub fn new(message: M) -> Self {
        Self(Some(Box::new(message)))
    }

    /// True when the slot holds a message
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Borrows the held message, if any
    #[must_use]
    pub fn get(&self) -> Option<&M> {
        self.0.as_deref()
    }

    /// Mutably borrows the held message, if any
    pub fn get_mut(&mut self) -> Option<&mut M> {
        self.0.as_deref_mut()
    }

    /// Stores `message`, replacing any previous occupant
    pub fn set(&mut self, message: M) {
        self.0 = Some(Box::new(message));
    }

    /// Removes and returns the held message
    pub fn take(&mut self) -> Option<M> {
        self.0.take().map(|boxed| *boxed)
    }
}

impl<M: Default> Boxed<M> {
    /// Borrows the held message, constructing a default one first when the
    /// slot is empty
    pub fn get_or_insert_default(&mut self) -> &mut M {
        self.0.get_or_insert_with(Box::default)
    }
}

impl<M> From<M> for Boxed<M> {
    fn from(message: M) -> Self {
        Self::new(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_distinguish_null_from_empty() {
        let null = ByteView::null();
        assert!(null.is_null());
        assert_eq!(None, null.as_bytes());

        let empty = ByteView::new(b"");
        assert!(!empty.is_null());
        assert_eq!(Some(&b""[..]), empty.as_bytes());

        assert_ne!(null, empty);
    }

    #[test]
    fn view_utf8_access() {
        assert_eq!(Some("sunsets"), ByteView::from("sunsets").as_str());
        assert_eq!(None, ByteView::new(&[0xff, 0xfe]).as_str());
        assert_eq!(None, ByteView::null().as_str());
    }

    #[test]
    fn boxed_slot_lifecycle() {
        let mut slot: Boxed<String> = Boxed::empty();
        assert!(!slot.is_present());
        assert_eq!(None, slot.get());

        slot.get_or_insert_default().push_str("hi");
        assert!(slot.is_present());
        assert_eq!(Some(&"hi".to_owned()), slot.get());

        assert_eq!(Some("hi".to_owned()), slot.take());
        assert!(!slot.is_present());
    }

    #[test]
    fn wrapper_conversions() {
        assert_eq!(Sint32(-1), Sint32::from(-1));
        assert_eq!(-1i32, Sint32(-1).value());
        assert_eq!(Fixed64(7), Fixed64::from(7u64));
        assert_eq!(Sfixed64(-123), Sfixed64::from(-123));
    }
}
