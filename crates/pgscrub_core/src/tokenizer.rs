// tokenizer.rs: COPY row splitting/joining and COPY text escaping
use memchr::{memchr, memchr_iter};
use std::borrow::Cow;

pub const FIELD_DELIMITER: u8 = b'\t';

/// Split a COPY data row on tabs. An empty line is one empty field.
pub fn split_row(line: &[u8]) -> Vec<&[u8]> {
    // Pre-reserve capacity based on tab count to reduce reallocations
    let mut out: Vec<&[u8]> = Vec::with_capacity(memchr_iter(FIELD_DELIMITER, line).count() + 1);
    let mut start = 0usize;
    while let Some(pos) = memchr(FIELD_DELIMITER, &line[start..]) {
        let end = start + pos;
        out.push(&line[start..end]);
        start = end + 1;
    }
    out.push(&line[start..]);
    out
}

pub fn join_row<S: AsRef<[u8]>>(fields: &[S]) -> Vec<u8> {
    let cap = fields.iter().map(|f| f.as_ref().len() + 1).sum::<usize>();
    let mut out = Vec::with_capacity(cap);
    for (i, f) in fields.iter().enumerate() {
        if i > 0 {
            out.push(FIELD_DELIMITER);
        }
        out.extend_from_slice(f.as_ref());
    }
    out
}

/// Field text for the transformer. Bytes that are not UTF-8 (a LATIN1 dump,
/// say) map one byte to one char, so the second value is `true` and the
/// result must go back through [`encode_field`] with the same flag.
pub fn decode_field(field: &[u8]) -> (Cow<'_, str>, bool) {
    match std::str::from_utf8(field) {
        Ok(s) => (Cow::Borrowed(s), false),
        Err(_) => (Cow::Owned(field.iter().map(|&b| b as char).collect()), true),
    }
}

/// Inverse of [`decode_field`]. In single-byte mode chars above U+00FF
/// cannot occur in transformer output, they become `?` all the same.
pub fn encode_field(value: &str, single_byte: bool) -> Vec<u8> {
    if !single_byte {
        return value.as_bytes().to_vec();
    }
    value.chars().map(|c| u8::try_from(c).unwrap_or(b'?')).collect()
}

/// Decode the backslash escapes COPY text format applies to field values.
/// Unknown escapes keep the escaped character.
pub fn unescape_copy_text(field: &str) -> String {
    if memchr(b'\\', field.as_bytes()).is_none() {
        return field.to_string();
    }
    let mut out = String::with_capacity(field.len());
    let mut chars = field.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub fn escape_copy_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            _ => out.push(c),
        }
    }
    out
}
