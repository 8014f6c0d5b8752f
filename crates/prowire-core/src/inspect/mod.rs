//! Forensic inspector: recovers probable message structure from bytes of
//! unknown provenance.
//!
//! The scanner walks the input looking for plausible tag+value records and
//! classifies each into a [`Span`]. Two modes:
//!
//! - **Strict**: the bytes must parse exactly as one top-level record,
//!   every byte belonging to a field with nothing left over. Anything else
//!   yields an empty span list.
//! - **Permissive**: garbage may be intermixed; the scanner slides forward
//!   to the next plausible tag boundary and collects the bytes in between
//!   into opaque [`SpanKind::Gap`] spans. The returned spans always
//!   partition the input exactly.
//!
//! A length-delimited payload is tentatively re-scanned (strictly) as a
//! nested message; if that fails it is reported as a byte-string span and
//! the renderer decides between raw and UTF-8 display. The inspector never
//! fails: at worst everything is a gap.

mod render;

pub use render::{render, render_to_string, RenderContext};

use tracing::{debug, trace};

use crate::codec::limits::{is_valid_field_number, MAX_MESSAGE_NESTING_DEPTH, MAX_SERIALIZED_SIZE};
use crate::codec::tag::{field_number_from_tag, wire_type_from_tag, Tag};
use crate::codec::wire::{max_varint_len, Decoder, WireType};
use crate::error::{Error, Result};
use render::compute_utf8_char_count;

/// A contiguous range of input bytes classified as one wire element
///
/// Offsets index the buffer handed to [`scan`]; the spans are plain data
/// and stay valid as long as the caller keeps that buffer around to render
/// against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    /// Offset of the first byte of the element (its tag, if it has one)
    pub begin: usize,
    /// Offset just past the last byte of the element
    pub end: usize,
    /// What the bytes were recognized as
    pub kind: SpanKind,
}

/// Classification of a [`Span`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanKind {
    /// A varint field, with its decoded 64-bit value
    Varint {
        /// Field number carried by the tag
        field_number: i32,
        /// The decoded value, before any signedness interpretation
        value: u64,
    },
    /// A fixed 32-bit field, raw bits
    Fixed32 {
        /// Field number carried by the tag
        field_number: i32,
        /// The 4 payload bytes, read little-endian
        value: u32,
    },
    /// A fixed 64-bit field, raw bits
    Fixed64 {
        /// Field number carried by the tag
        field_number: i32,
        /// The 8 payload bytes, read little-endian
        value: u64,
    },
    /// A length-delimited field whose payload did not scan as a message
    Bytes {
        /// Field number carried by the tag
        field_number: i32,
        /// Offset of the payload (just past the length varint)
        payload_begin: usize,
        /// UTF-8 character count of the payload, or its negation when the
        /// payload is not valid UTF-8
        utf8_chars: i64,
    },
    /// A length-delimited field whose payload scanned cleanly as a message
    Message {
        /// Field number carried by the tag; 0 for the synthetic top-level
        /// wrapper made by [`parse_probable_message`]
        field_number: i32,
        /// The child spans, in wire order
        fields: Vec<Span>,
    },
    /// Bytes with no plausible structure; produced only in permissive mode
    Gap,
}

impl Span {
    /// The field number, for field-bearing spans
    #[must_use]
    pub fn field_number(&self) -> Option<i32> {
        match &self.kind {
            SpanKind::Varint { field_number, .. }
            | SpanKind::Fixed32 { field_number, .. }
            | SpanKind::Fixed64 { field_number, .. }
            | SpanKind::Bytes { field_number, .. }
            | SpanKind::Message { field_number, .. } => Some(*field_number),
            SpanKind::Gap => None,
        }
    }

    /// Number of input bytes the span covers
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.begin
    }

    /// True for a zero-length span (only the synthetic wrapper over empty
    /// input)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.begin == self.end
    }
}

/// Scans `data` for plausible wire structure
///
/// In permissive mode the result always partitions the whole input; in
/// strict mode it is either a full partition into field spans or empty.
#[must_use]
pub fn scan(data: &[u8], permissive: bool) -> Vec<Span> {
    debug!(bytes = data.len(), permissive, "scanning for wire structure");
    let spans = scan_fields(data, 0, data.len(), 0, permissive);
    debug!(spans = spans.len(), "scan complete");
    spans
}

/// Strict-mode convenience: scans `data` and, when every byte is accounted
/// for, wraps the fields in a synthetic top-level message span (field
/// number 0)
#[must_use]
pub fn parse_probable_message(data: &[u8]) -> Option<Span> {
    let fields = scan(data, false);
    if fields.is_empty() == data.is_empty() {
        Some(Span {
            begin: 0,
            end: data.len(),
            kind: SpanKind::Message {
                field_number: 0,
                fields,
            },
        })
    } else {
        None
    }
}

/// Reads up to [`MAX_SERIALIZED_SIZE`] bytes of `path` and permissively
/// scans them
///
/// Returns the buffer alongside the spans, since rendering needs both.
pub fn inspect_file(path: impl AsRef<std::path::Path>) -> Result<(Vec<u8>, Vec<Span>)> {
    use std::io::Read;

    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| Error::file_read(path, e))?;
    let mut data = Vec::new();
    file.take(MAX_SERIALIZED_SIZE as u64)
        .read_to_end(&mut data)
        .map_err(|e| Error::file_read(path, e))?;
    let spans = scan(&data, true);
    Ok((data, spans))
}

/// Longest plausible tag encoding: a varint holding 32 bits
const MAX_TAG_LEN: usize = max_varint_len(32);

/// Longest plausible value varint: 64 bits
const MAX_VALUE_VARINT_LEN: usize = max_varint_len(64);

/// Longest plausible length prefix: 32 bits
const MAX_LENGTH_VARINT_LEN: usize = max_varint_len(32);

/// Tries to read a plausible tag at `begin`
///
/// Plausible means: the varint fits a tag, the field number is valid, and
/// the wire type is one of the four in current use.
fn maybe_parse_tag(data: &[u8], begin: usize, end: usize) -> Option<(usize, Tag)> {
    let mut dec = Decoder::new(&data[begin..end]);
    let tag = dec.read_varint32().ok()?;
    if dec.position() > MAX_TAG_LEN {
        return None;
    }
    if !is_valid_field_number(field_number_from_tag(tag)) {
        return None;
    }
    match wire_type_from_tag(tag).ok()? {
        WireType::Varint | WireType::I64 | WireType::Len | WireType::I32 => {
            Some((begin + dec.position(), tag))
        }
        WireType::StartGroup | WireType::EndGroup => None,
    }
}

/// Slides a cursor from `begin` until a plausible tag starts, returning
/// its bounds and value
fn find_next_valid_tag(data: &[u8], begin: usize, end: usize) -> Option<(usize, usize, Tag)> {
    (begin..end).find_map(|tag_begin| {
        maybe_parse_tag(data, tag_begin, end).map(|(tag_end, tag)| (tag_begin, tag_end, tag))
    })
}

/// Extends a trailing gap span over `begin..end`, or appends a new one
///
/// Adjacent gaps merge so byte-at-a-time rejection doesn't fragment the
/// output.
fn merge_or_append_gap(spans: &mut Vec<Span>, begin: usize, end: usize) {
    if let Some(last) = spans.last_mut() {
        if last.kind == SpanKind::Gap && begin <= last.end && begin >= last.begin && end > last.end
        {
            last.end = end;
            return;
        }
    }
    spans.push(Span {
        begin,
        end,
        kind: SpanKind::Gap,
    });
}

fn scan_fields(data: &[u8], start: usize, end: usize, depth: u32, permissive: bool) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    let mut begin = start;

    while begin < end {
        let (tag_begin, tag_end, tag) = if permissive {
            match find_next_valid_tag(data, begin, end) {
                None => {
                    merge_or_append_gap(&mut spans, begin, end);
                    break;
                }
                Some((tag_begin, tag_end, tag)) => {
                    if tag_begin > begin {
                        merge_or_append_gap(&mut spans, begin, tag_begin);
                    }
                    (tag_begin, tag_end, tag)
                }
            }
        } else {
            match maybe_parse_tag(data, begin, end) {
                None => return Vec::new(),
                Some((tag_end, tag)) => (begin, tag_end, tag),
            }
        };

        let field_number = field_number_from_tag(tag);
        let wire_type = wire_type_from_tag(tag).unwrap_or(WireType::Varint);

        // On any implausible value: strict mode gives up, permissive mode
        // rolls back to just after the tag's first byte and grows a gap.
        let reject = |spans: &mut Vec<Span>, begin: &mut usize| -> bool {
            if !permissive {
                return false;
            }
            merge_or_append_gap(spans, tag_begin, tag_begin + 1);
            *begin = tag_begin + 1;
            true
        };

        match wire_type {
            WireType::Varint => {
                let mut dec = Decoder::new(&data[tag_end..end]);
                match dec.read_varint() {
                    Ok(value) if dec.position() <= MAX_VALUE_VARINT_LEN => {
                        let value_end = tag_end + dec.position();
                        trace!(field_number, value, "varint span");
                        spans.push(Span {
                            begin: tag_begin,
                            end: value_end,
                            kind: SpanKind::Varint {
                                field_number,
                                value,
                            },
                        });
                        begin = value_end;
                    }
                    _ => {
                        if !reject(&mut spans, &mut begin) {
                            return Vec::new();
                        }
                    }
                }
            }

            WireType::Len => {
                let mut dec = Decoder::new(&data[tag_end..end]);
                let plausible = match dec.read_varint() {
                    Ok(size)
                        if dec.position() <= MAX_LENGTH_VARINT_LEN
                            && (size as i64) >= 0
                            && size as usize <= end - (tag_end + dec.position()) =>
                    {
                        Some((size as usize, tag_end + dec.position()))
                    }
                    _ => None,
                };
                match plausible {
                    Some((size, size_end)) => {
                        let value_end = size_end + size;

                        // Tentatively re-scan the payload as a message.
                        // There is no reliable way to tell a packed scalar
                        // run from a string, so anything that fails the
                        // message scan is reported as bytes.
                        let nested = if depth < MAX_MESSAGE_NESTING_DEPTH {
                            scan_fields(data, size_end, value_end, depth + 1, false)
                        } else {
                            Vec::new()
                        };

                        if nested.is_empty() {
                            trace!(field_number, size, "bytes span");
                            spans.push(Span {
                                begin: tag_begin,
                                end: value_end,
                                kind: SpanKind::Bytes {
                                    field_number,
                                    payload_begin: size_end,
                                    utf8_chars: compute_utf8_char_count(
                                        &data[size_end..value_end],
                                    ),
                                },
                            });
                        } else {
                            trace!(field_number, size, "nested message span");
                            spans.push(Span {
                                begin: tag_begin,
                                end: value_end,
                                kind: SpanKind::Message {
                                    field_number,
                                    fields: nested,
                                },
                            });
                        }
                        begin = value_end;
                    }
                    None => {
                        if !reject(&mut spans, &mut begin) {
                            return Vec::new();
                        }
                    }
                }
            }

            WireType::I64 => {
                let mut dec = Decoder::new(&data[tag_end..end]);
                match dec.read_fixed64() {
                    Ok(value) => {
                        let value_end = tag_end + 8;
                        spans.push(Span {
                            begin: tag_begin,
                            end: value_end,
                            kind: SpanKind::Fixed64 {
                                field_number,
                                value,
                            },
                        });
                        begin = value_end;
                    }
                    Err(_) => {
                        if !reject(&mut spans, &mut begin) {
                            return Vec::new();
                        }
                    }
                }
            }

            WireType::I32 => {
                let mut dec = Decoder::new(&data[tag_end..end]);
                match dec.read_fixed32() {
                    Ok(value) => {
                        let value_end = tag_end + 4;
                        spans.push(Span {
                            begin: tag_begin,
                            end: value_end,
                            kind: SpanKind::Fixed32 {
                                field_number,
                                value,
                            },
                        });
                        begin = value_end;
                    }
                    Err(_) => {
                        if !reject(&mut spans, &mut begin) {
                            return Vec::new();
                        }
                    }
                }
            }

            // maybe_parse_tag filtered these out.
            WireType::StartGroup | WireType::EndGroup => unreachable!(),
        }
    }

    spans
}
