//! Renders a span tree as an annotated hex dump.
//!
//! Output is a sequence of monospace lines:
//!
//! ```text
//! OFFSET  HH HH HH … HH  <interpretation>
//! ```
//!
//! Each span draws its own rows, filling only the hex columns for bytes it
//! owns; several spans can therefore share a row, each contributing a
//! partial line. Interpretations show every plausible reading of a value
//! (unsigned, two's-complement, ZigZag, boolean, float), since the scanner
//! cannot know the schema. Raw bytes render through a fixed 256-glyph
//! table following the classic code-page-437 display convention, which
//! keeps control bytes visible as distinct symbols.

use std::fmt;

use crate::codec::wire::zigzag_decode64;
use crate::inspect::{Span, SpanKind};

/// Visible stand-ins for the 32 control bytes, per code page 437
const CONTROL_GLYPHS: [&str; 32] = [
    "␀", "☺", "☻", "♥", "♦", "♣", "♠", "•", "◘", "○", "◙", "♂", "♀", "♪", "♫", "☼", "►", "◄", "↕",
    "‼", "¶", "§", "▬", "↨", "↑", "↓", "→", "←", "∟", "↔", "▲", "▼",
];

/// Glyphs for byte values 127 through 255, per code page 437
const HIGH_GLYPHS: [&str; 129] = [
    "⌂", "Ç", "ü", "é", "â", "ä", "à", "å", "ç", "ê", "ë", "è", "ï", "î", "ì", "Ä", "Å", "É", "æ",
    "Æ", "ô", "ö", "ò", "û", "ù", "ÿ", "Ö", "Ü", "¢", "£", "¥", "₧", "ƒ", "á", "í", "ó", "ú", "ñ",
    "Ñ", "ª", "º", "¿", "⌐", "¬", "½", "¼", "¡", "«", "»", "░", "▒", "▓", "│", "┤", "╡", "╢", "╖",
    "╕", "╣", "║", "╗", "╝", "╜", "╛", "┐", "└", "┴", "┬", "├", "─", "┼", "╞", "╟", "╚", "╔", "╩",
    "╦", "╠", "═", "╬", "╧", "╨", "╤", "╥", "╙", "╘", "╒", "╓", "╫", "╪", "┘", "┌", "█", "▄", "▌",
    "▐", "▀", "α", "ß", "Γ", "π", "Σ", "σ", "µ", "τ", "Φ", "Θ", "Ω", "δ", "∞", "φ", "ε", "∩", "≡",
    "±", "≥", "≤", "⌠", "⌡", "÷", "≈", "°", "∙", "·", "√", "ⁿ", "²", "■", " ",
];

/// Gap between the hex columns and the interpretation column
const BASE_INDENT: &str = "  ";

/// Extra indentation for the continuation rows of a byte-string span
const CONTINUATION_INDENT: &str = "    ";

/// Indentation fence marking rows that belong to a nested message
const MESSAGE_FENCE: &str = "  ⦙ ";

/// Layout parameters for [`render`]
#[derive(Debug, Clone)]
pub struct RenderContext {
    bytes_per_line: usize,
    max_bytes: usize,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext {
    /// A context with 16 hex columns and no byte limit
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes_per_line: 16,
            max_bytes: usize::MAX,
        }
    }

    /// Sets the number of hex columns per row
    #[must_use]
    pub fn bytes_per_line(mut self, count: usize) -> Self {
        assert!(count > 0, "a row must hold at least one byte");
        self.bytes_per_line = count;
        self
    }

    /// Sets a soft limit on how many input bytes are rendered
    ///
    /// Rows past the limit are dropped and truncated spans gain a trailing
    /// `…`.
    #[must_use]
    pub fn max_bytes(mut self, count: usize) -> Self {
        self.max_bytes = count;
        self
    }
}

/// Renders `spans` over `data` into `out`, one newline-terminated line per
/// formatted row
pub fn render<W: fmt::Write>(
    data: &[u8],
    spans: &[Span],
    ctx: &RenderContext,
    out: &mut W,
) -> fmt::Result {
    let mut renderer = Renderer {
        data,
        bytes_per_line: ctx.bytes_per_line,
        limit: ctx.max_bytes,
        indent: String::from(BASE_INDENT),
    };
    for span in spans {
        for line in renderer.span_lines(span) {
            writeln!(out, "{line}")?;
        }
    }
    Ok(())
}

/// Convenience wrapper collecting [`render`] output into a `String`
#[must_use]
pub fn render_to_string(data: &[u8], spans: &[Span], ctx: &RenderContext) -> String {
    let mut text = String::new();
    render(data, spans, ctx, &mut text).expect("fmt::Write to String cannot fail");
    text
}

struct Renderer<'d> {
    data: &'d [u8],
    bytes_per_line: usize,
    limit: usize,
    indent: String,
}

impl Renderer<'_> {
    /// Offset of the first byte of the row containing `offset`
    fn row_offset_of(&self, offset: usize) -> usize {
        (offset / self.bytes_per_line) * self.bytes_per_line
    }

    /// One row of the hex column: the address, then `bytes_per_line` slots,
    /// filled only for bytes inside `begin..end`
    fn hex_row(&self, row_offset: usize, begin: usize, end: usize) -> String {
        let mut row = format!("{row_offset:08x} ");
        for i in 0..self.bytes_per_line {
            let pos = row_offset + i;
            if pos >= begin && pos < end {
                row.push_str(&format!(" {:02x}", self.data[pos]));
            } else {
                row.push_str("   ");
            }
        }
        row
    }

    /// All hex rows touched by `begin..end`, clipped to the render limit
    fn hex_rows(&self, begin: usize, end: usize) -> Vec<String> {
        let mut rows = Vec::new();
        if begin >= end || begin >= self.limit {
            return rows;
        }
        let last = end.min(self.limit) - 1;
        let mut row_offset = self.row_offset_of(begin);
        let end_row_offset = self.row_offset_of(last) + self.bytes_per_line;
        while row_offset != end_row_offset {
            rows.push(self.hex_row(row_offset, begin, end));
            row_offset += self.bytes_per_line;
        }
        rows
    }

    fn span_lines(&mut self, span: &Span) -> Vec<String> {
        match &span.kind {
            SpanKind::Gap => self.gap_lines(span),
            SpanKind::Varint {
                field_number,
                value,
            } => self.scalar_lines(span, varint_interpretation(*field_number, *value)),
            SpanKind::Fixed32 {
                field_number,
                value,
            } => self.scalar_lines(span, fixed32_interpretation(*field_number, *value)),
            SpanKind::Fixed64 {
                field_number,
                value,
            } => self.scalar_lines(span, fixed64_interpretation(*field_number, *value)),
            SpanKind::Bytes {
                field_number,
                payload_begin,
                utf8_chars,
            } => self.bytes_lines(span, *field_number, *payload_begin, *utf8_chars),
            SpanKind::Message {
                field_number,
                fields,
            } => self.message_lines(span, *field_number, fields),
        }
    }

    /// An unknown gap: hex rows with the raw bytes echoed as glyphs, no
    /// left-hand interpretation
    fn gap_lines(&self, span: &Span) -> Vec<String> {
        let mut lines = self.hex_rows(span.begin, span.end);
        let mut row_begin = self.row_offset_of(span.begin);
        for line in &mut lines {
            line.push_str(&self.indent);
            let from = span.begin.max(row_begin);
            let to = span.end.min(row_begin + self.bytes_per_line);
            push_raw_glyphs(&self.data[from..to], line);
            row_begin += self.bytes_per_line;
        }
        lines
    }

    /// A varint or fixed-width field: interpretation on the first row,
    /// bare indentation on any continuation rows
    fn scalar_lines(&self, span: &Span, interpretation: String) -> Vec<String> {
        let mut lines = self.hex_rows(span.begin, span.end);
        if lines.is_empty() {
            return lines;
        }
        lines[0].push_str(&self.indent);
        lines[0].push_str(&interpretation);
        for line in &mut lines[1..] {
            line.push_str(&self.indent);
        }
        lines
    }

    fn bytes_lines(
        &mut self,
        span: &Span,
        field_number: i32,
        payload_begin: usize,
        utf8_chars: i64,
    ) -> Vec<String> {
        let mut lines = self.hex_rows(span.begin, span.end);
        if lines.is_empty() {
            return lines;
        }

        let is_utf8 = utf8_chars >= 0;
        lines[0].push_str(&self.indent);
        if is_utf8 {
            lines[0].push_str(&format!("[{field_number}] = {utf8_chars}-char UTF-8: "));
        } else {
            let byte_count = span.end - payload_begin;
            lines[0].push_str(&format!("[{field_number}] = {byte_count} byte(s): "));
        }

        self.indent.push_str(CONTINUATION_INDENT);
        let payload = &self.data[payload_begin..span.end];
        let mut row_begin = self.row_offset_of(span.begin);
        for (i, line) in lines.iter_mut().enumerate() {
            if i != 0 {
                line.push_str(&self.indent);
            }
            let row_end = row_begin + self.bytes_per_line;
            if payload_begin < row_end {
                let from = payload_begin.max(row_begin) - payload_begin;
                let to = span.end.min(row_end) - payload_begin;
                if is_utf8 {
                    push_utf8_glyphs(payload, from, to, line);
                } else {
                    push_raw_glyphs(&payload[from..to], line);
                }
            }
            row_begin += self.bytes_per_line;
        }
        self.indent
            .truncate(self.indent.len() - CONTINUATION_INDENT.len());

        if span.end > self.limit && self.row_offset_of(span.end) != self.row_offset_of(self.limit) {
            if let Some(last) = lines.last_mut() {
                last.push('…');
            }
        }
        lines
    }

    /// A nested message: the tag+length row, the indented field rows behind
    /// a fence, and a closing brace row
    fn message_lines(&mut self, span: &Span, field_number: i32, fields: &[Span]) -> Vec<String> {
        let mut lines = Vec::new();

        let length_varint_end = fields.first().map_or(span.end, |field| field.begin);
        lines.push(self.hex_row(
            self.row_offset_of(span.begin),
            span.begin,
            length_varint_end.min(self.limit),
        ));

        let message_size = match (fields.first(), fields.last()) {
            (Some(first), Some(last)) => last.end - first.begin,
            _ => 0,
        };
        lines[0].push_str(&self.indent);
        lines[0].push_str(&format!("[{field_number}] = {message_size}-byte message {{"));

        self.indent.push_str(MESSAGE_FENCE);
        let mut incomplete = false;
        for field in fields {
            if field.begin >= self.limit {
                incomplete = true;
                break;
            }
            lines.extend(self.span_lines(field));
        }
        self.indent.truncate(self.indent.len() - MESSAGE_FENCE.len());

        let mut closing = self.hex_row(self.row_offset_of(span.end), span.end, span.end);
        closing.push_str(&self.indent);
        if incomplete {
            closing.push('…');
        }
        closing.push('}');
        lines.push(closing);

        lines
    }
}

fn varint_interpretation(field_number: i32, value: u64) -> String {
    let signed = value as i64;
    let mut text = format!("[{field_number}] = ");
    if signed >= 0 {
        text.push_str(&format!("(u)intXX{{{value}"));
    } else {
        text.push_str(&format!("uintXX{{{value}}} | intXX{{{signed}"));
    }
    text.push_str(&format!("}} | sintXX{{{}}}", zigzag_decode64(value)));
    if value <= 1 {
        text.push_str(&format!(" | bool{{{}}}", value == 1));
    }
    text
}

fn fixed32_interpretation(field_number: i32, value: u32) -> String {
    let float = f32::from_bits(value);
    let signed = value as i32;
    if signed >= 0 {
        format!("[{field_number}] = float{{{float}}} | (s)fixed32{{{value}}}")
    } else {
        format!("[{field_number}] = float{{{float}}} | fixed32{{{value}}} | sfixed32{{{signed}}}")
    }
}

fn fixed64_interpretation(field_number: i32, value: u64) -> String {
    let double = f64::from_bits(value);
    let signed = value as i64;
    if signed >= 0 {
        format!("[{field_number}] = double{{{double}}} | (s)fixed64{{{value}}}")
    } else {
        format!("[{field_number}] = double{{{double}}} | fixed64{{{value}}} | sfixed64{{{signed}}}")
    }
}

/// Appends the display glyph for one raw byte
fn push_byte_glyph(byte: u8, out: &mut String) {
    if byte < 32 {
        out.push_str(CONTROL_GLYPHS[byte as usize]);
    } else if byte < 127 {
        out.push(byte as char);
    } else {
        out.push_str(HIGH_GLYPHS[(byte - 127) as usize]);
    }
}

/// Appends display glyphs for a run of raw (non-UTF-8) bytes
fn push_raw_glyphs(bytes: &[u8], out: &mut String) {
    for &byte in bytes {
        push_byte_glyph(byte, out);
    }
}

/// Appends glyphs for the byte range `from..to` of a validated UTF-8
/// payload
///
/// Multi-byte characters pass through verbatim, except U+0080 through
/// U+009F (the Unicode C1 controls), which are remapped through the glyph
/// table instead of being emitted raw. A range starting in the middle of a
/// multi-byte sequence skips its leading continuation bytes.
fn push_utf8_glyphs(payload: &[u8], from: usize, to: usize, out: &mut String) {
    let mut i = from;
    while i < to {
        let byte = payload[i];
        if byte >> 7 == 0 {
            push_byte_glyph(byte, out);
            i += 1;
        } else if byte >> 6 == 0b11 {
            let len = if byte >> 4 == 0b1111 {
                4
            } else if byte >> 5 == 0b111 {
                3
            } else {
                2
            };
            if byte == 0b1100_0010 && i + 1 < payload.len() && payload[i + 1] >> 5 == 0b100 {
                push_byte_glyph(0x80 | (payload[i + 1] & 0x1f), out);
            } else if let Some(seq) = payload.get(i..i + len) {
                if let Ok(text) = std::str::from_utf8(seq) {
                    out.push_str(text);
                }
            }
            i += len.min(payload.len() - i);
        } else {
            // Continuation byte: the range began mid-character.
            i += 1;
        }
    }
}

/// Counts the characters in `bytes` as UTF-8
///
/// Returns the character count when the whole range is valid, or the
/// negation of the running count at the first offense. Rejected forms:
/// first bytes in `0x80..=0xC1` or `>= 0xF5`, truncated sequences, overlong
/// encodings, surrogate code points, and values above U+10FFFF.
pub(crate) fn compute_utf8_char_count(bytes: &[u8]) -> i64 {
    // Start from one char per byte and subtract for each continuation byte
    // of a well-formed multi-byte sequence.
    let mut char_count = bytes.len() as i64;

    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b >> 7 == 0 {
            i += 1;
            continue;
        }
        if (0x80..=0xC1).contains(&b) || b >= 0xF5 {
            return -char_count;
        }

        if b >> 5 == 0b110 {
            // U+0080 to U+07FF. No overlong/range check needed: lead bytes
            // C2..DF only cover exactly that range.
            if i + 1 >= bytes.len() || bytes[i + 1] >> 6 != 0b10 {
                return -char_count;
            }
            char_count -= 1;
            i += 2;
        } else if b >> 4 == 0b1110 {
            // U+0800 to U+FFFF, minus the surrogate window.
            if i + 2 >= bytes.len()
                || bytes[i + 1] >> 6 != 0b10
                || bytes[i + 2] >> 6 != 0b10
            {
                return -char_count;
            }
            let value = (((b & 0x0f) as u32) << 12)
                | (((bytes[i + 1] & 0x3f) as u32) << 6)
                | (bytes[i + 2] & 0x3f) as u32;
            if value < 0x800 || (0xD800..=0xDFFF).contains(&value) {
                return -char_count;
            }
            char_count -= 2;
            i += 3;
        } else {
            // U+10000 to U+10FFFF.
            if i + 3 >= bytes.len()
                || bytes[i + 1] >> 6 != 0b10
                || bytes[i + 2] >> 6 != 0b10
                || bytes[i + 3] >> 6 != 0b10
            {
                return -char_count;
            }
            let value = (((b & 0x07) as u32) << 18)
                | (((bytes[i + 1] & 0x3f) as u32) << 12)
                | (((bytes[i + 2] & 0x3f) as u32) << 6)
                | (bytes[i + 3] & 0x3f) as u32;
            if !(0x10000..=0x10FFFF).contains(&value) {
                return -char_count;
            }
            char_count -= 3;
            i += 4;
        }
    }

    char_count
}
