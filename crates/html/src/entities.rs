//! Entity and character reference decoding.
//!
//! Contract:
//! - Named references decode only for the names in [`NAMED_REFERENCES`], and only
//!   when `;`-terminated.
//! - Numeric references decode when well-formed, `;`-terminated and naming a valid
//!   Unicode scalar value. `&#0;` and surrogates are left unchanged.
//! - Anything else passes through verbatim, so decoding never loses input.
//!
//! This is not an HTML5-complete table; unknown names stay as written.

use std::borrow::Cow;

const MAX_HEX_DIGITS: usize = 6; // 0x10FFFF
const MAX_DEC_DIGITS: usize = 7; // 1114111
const MAX_NAME_LEN: usize = 32;

/// Named references understood by the decoder, sorted by name.
pub const NAMED_REFERENCES: &[(&str, char)] = &[
    ("amp", '&'),
    ("apos", '\''),
    ("bull", '\u{2022}'),
    ("cent", '\u{00A2}'),
    ("copy", '\u{00A9}'),
    ("deg", '\u{00B0}'),
    ("divide", '\u{00F7}'),
    ("euro", '\u{20AC}'),
    ("gt", '>'),
    ("hellip", '\u{2026}'),
    ("laquo", '\u{00AB}'),
    ("ldquo", '\u{201C}'),
    ("lsquo", '\u{2018}'),
    ("lt", '<'),
    ("mdash", '\u{2014}'),
    ("middot", '\u{00B7}'),
    ("nbsp", '\u{00A0}'),
    ("ndash", '\u{2013}'),
    ("para", '\u{00B6}'),
    ("pound", '\u{00A3}'),
    ("quot", '"'),
    ("raquo", '\u{00BB}'),
    ("rdquo", '\u{201D}'),
    ("reg", '\u{00AE}'),
    ("rsquo", '\u{2019}'),
    ("sect", '\u{00A7}'),
    ("shy", '\u{00AD}'),
    ("times", '\u{00D7}'),
    ("trade", '\u{2122}'),
    ("yen", '\u{00A5}'),
];

/// Decode one complete reference such as `&amp;`, `&#60;` or `&#x3C;`.
pub fn decode_reference(reference: &str) -> Option<char> {
    let body = reference.strip_prefix('&')?.strip_suffix(';')?;
    if let Some(numeric) = body.strip_prefix('#') {
        let (digits, radix, max) = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => (hex, 16, MAX_HEX_DIGITS),
            None => (numeric, 10, MAX_DEC_DIGITS),
        };
        if digits.is_empty()
            || digits.len() > max
            || !digits.bytes().all(|b| b.is_ascii_hexdigit())
        {
            return None;
        }
        return u32::from_str_radix(digits, radix)
            .ok()
            .filter(|&scalar| scalar != 0)
            .and_then(char::from_u32);
    }
    NAMED_REFERENCES
        .binary_search_by(|(name, _)| (*name).cmp(body))
        .ok()
        .map(|index| NAMED_REFERENCES[index].1)
}

/// Decode every well-formed reference in `s`, leaving everything else unchanged.
pub fn decode_entities(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    let Some(first) = memchr::memchr(b'&', bytes) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len());
    out.push_str(&s[..first]);
    let mut i = first;
    while i < bytes.len() {
        if bytes[i] != b'&' {
            let next = memchr::memchr(b'&', &bytes[i..]).map_or(bytes.len(), |rel| i + rel);
            out.push_str(&s[i..next]);
            i = next;
            continue;
        }
        // Bounded scan for the terminator keeps adversarial input linear.
        let window_end = bytes.len().min(i + MAX_NAME_LEN + 3);
        let decoded = memchr::memchr(b';', &bytes[i..window_end])
            .and_then(|rel| decode_reference(&s[i..=i + rel]).map(|ch| (ch, i + rel + 1)));
        match decoded {
            Some((ch, end)) => {
                out.push(ch);
                i = end;
            }
            None => {
                out.push('&');
                i += 1;
            }
        }
    }
    Cow::Owned(out)
}
