use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Commonly used named character references. Unknown names pass through as
/// literal text rather than erroring.
static NAMED_ENTITIES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let pairs: &[(&str, &str)] = &[
        ("amp", "&"),
        ("lt", "<"),
        ("gt", ">"),
        ("quot", "\""),
        ("apos", "'"),
        ("AMP", "&"),
        ("LT", "<"),
        ("GT", ">"),
        ("QUOT", "\""),
        ("nbsp", "\u{a0}"),
        ("copy", "\u{a9}"),
        ("reg", "\u{ae}"),
        ("trade", "\u{2122}"),
        ("deg", "\u{b0}"),
        ("plusmn", "\u{b1}"),
        ("micro", "\u{b5}"),
        ("para", "\u{b6}"),
        ("sect", "\u{a7}"),
        ("middot", "\u{b7}"),
        ("laquo", "\u{ab}"),
        ("raquo", "\u{bb}"),
        ("frac12", "\u{bd}"),
        ("frac14", "\u{bc}"),
        ("frac34", "\u{be}"),
        ("times", "\u{d7}"),
        ("divide", "\u{f7}"),
        ("szlig", "\u{df}"),
        ("agrave", "\u{e0}"),
        ("aacute", "\u{e1}"),
        ("auml", "\u{e4}"),
        ("aring", "\u{e5}"),
        ("aelig", "\u{e6}"),
        ("ccedil", "\u{e7}"),
        ("egrave", "\u{e8}"),
        ("eacute", "\u{e9}"),
        ("ntilde", "\u{f1}"),
        ("ouml", "\u{f6}"),
        ("oslash", "\u{f8}"),
        ("uuml", "\u{fc}"),
        ("ndash", "\u{2013}"),
        ("mdash", "\u{2014}"),
        ("lsquo", "\u{2018}"),
        ("rsquo", "\u{2019}"),
        ("ldquo", "\u{201c}"),
        ("rdquo", "\u{201d}"),
        ("dagger", "\u{2020}"),
        ("Dagger", "\u{2021}"),
        ("bull", "\u{2022}"),
        ("hellip", "\u{2026}"),
        ("permil", "\u{2030}"),
        ("prime", "\u{2032}"),
        ("Prime", "\u{2033}"),
        ("euro", "\u{20ac}"),
        ("larr", "\u{2190}"),
        ("uarr", "\u{2191}"),
        ("rarr", "\u{2192}"),
        ("darr", "\u{2193}"),
        ("infin", "\u{221e}"),
        ("ne", "\u{2260}"),
        ("le", "\u{2264}"),
        ("ge", "\u{2265}"),
    ];
    for (name, value) in pairs {
        map.insert(*name, *value);
    }
    map
});

/// Decodes a character reference at the start of `text` (which begins with
/// `&`). Returns the replacement string and the number of bytes consumed.
/// Numeric references are capped at 7 decimal / 6 hex digits; references to
/// NUL or invalid codepoints produce U+FFFD.
pub(crate) fn decode_entity(text: &str) -> Option<(String, usize)> {
    let bytes = text.as_bytes();
    if bytes.first() != Some(&b'&') {
        return None;
    }
    if bytes.get(1) == Some(&b'#') {
        let (radix, digit_start, max_digits) = match bytes.get(2) {
            Some(b'x') | Some(b'X') => (16, 3, 6),
            _ => (10, 2, 7),
        };
        let mut end = digit_start;
        while end < bytes.len()
            && end - digit_start < max_digits
            && (bytes[end] as char).is_digit(radix)
        {
            end += 1;
        }
        if end == digit_start || bytes.get(end) != Some(&b';') {
            return None;
        }
        let value = u32::from_str_radix(&text[digit_start..end], radix).ok()?;
        let ch = match char::from_u32(value) {
            Some(ch) if value != 0 => ch,
            _ => '\u{fffd}',
        };
        return Some((ch.to_string(), end + 1));
    }
    // Named form: letters and digits up to a semicolon.
    let mut end = 1;
    while end < bytes.len() && end < 33 && bytes[end].is_ascii_alphanumeric() {
        end += 1;
    }
    if end == 1 || bytes.get(end) != Some(&b';') {
        return None;
    }
    let replacement = NAMED_ENTITIES.get(&text[1..end])?;
    Some(((*replacement).to_string(), end + 1))
}

/// Resolves backslash escapes and character references in a stored string
/// (link destinations, titles, fence info strings).
pub(crate) fn unescape_and_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while pos < bytes.len() {
        match bytes[pos] {
            b'\\' if pos + 1 < bytes.len() && bytes[pos + 1].is_ascii_punctuation() => {
                out.push(bytes[pos + 1] as char);
                pos += 2;
            }
            b'&' => {
                if let Some((decoded, used)) = decode_entity(&text[pos..]) {
                    out.push_str(&decoded);
                    pos += used;
                } else {
                    out.push('&');
                    pos += 1;
                }
            }
            _ => {
                let ch = text[pos..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
    out
}

/// Percent-encodes a destination for use in an URL attribute. Bytes already
/// part of a valid `%XX` escape are kept as-is.
pub(crate) fn percent_encode_url(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut pos = 0;
    while pos < bytes.len() {
        let b = bytes[pos];
        if b == b'%'
            && pos + 2 < bytes.len()
            && bytes[pos + 1].is_ascii_hexdigit()
            && bytes[pos + 2].is_ascii_hexdigit()
        {
            out.push_str(&url[pos..pos + 3]);
            pos += 3;
            continue;
        }
        let keep = b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'-' | b'_' | b'.' | b'~' | b'/' | b'?' | b'#' | b':' | b'@' | b'!' | b'$'
                    | b'&' | b'\'' | b'(' | b')' | b'*' | b'+' | b',' | b';' | b'=' | b'%'
            );
        if keep {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
        pos += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{decode_entity, percent_encode_url, unescape_and_decode};

    #[test]
    fn named_and_numeric_references_decode() {
        assert_eq!(decode_entity("&amp;x"), Some(("&".to_string(), 5)));
        assert_eq!(decode_entity("&#35;"), Some(("#".to_string(), 5)));
        assert_eq!(decode_entity("&#X22;"), Some(("\"".to_string(), 6)));
        assert_eq!(decode_entity("&#0;"), Some(("\u{fffd}".to_string(), 4)));
        assert_eq!(decode_entity("&nosuchthing;"), None);
        assert_eq!(decode_entity("&amp"), None);
    }

    #[test]
    fn unescape_resolves_backslashes_and_references() {
        assert_eq!(unescape_and_decode("a\\*b&amp;c"), "a*b&c");
        assert_eq!(unescape_and_decode("\\n"), "\\n");
    }

    #[test]
    fn percent_encoding_keeps_existing_escapes() {
        assert_eq!(percent_encode_url("/a b"), "/a%20b");
        assert_eq!(percent_encode_url("/a%20b"), "/a%20b");
        assert_eq!(percent_encode_url("/\u{e9}"), "/%C3%A9");
    }
}
