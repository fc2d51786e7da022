//! Low-level primitives over raw soundlist text: locating tags, reading
//! attributes (double, single or un-quoted) and entity decoding.
//!
//! All offsets are byte offsets into the full document text.

use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    /// Entity-decoded value
    pub value: String,
    /// From the first byte of the name through the closing quote
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes(Vec<Attribute>);

impl Attributes {
    /// Attribute names compare case-insensitively.
    pub fn find(&self, name: &str) -> Option<&Attribute> {
        self.0.iter().find(|a| a.name.eq_ignore_ascii_case(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.find(name).map(|a| a.value.as_str())
    }

    /// Like `get`, but treats empty values as absent.
    pub fn non_empty(&self, name: &str) -> Option<&str> {
        self.get(name).map(str::trim).filter(|v| !v.is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One opening (or self-closing) tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    /// `<` through `>` inclusive
    pub span: Range<usize>,
    pub attrs: Attributes,
    pub self_closing: bool,
}

impl Tag {
    /// Offset just after the last attribute (or the name), before any
    /// whitespace that precedes `/>` or `>`. New attributes go here.
    pub fn content_end(&self, text: &str) -> usize {
        let marker = if self.self_closing { 2 } else { 1 };
        let mut end = self.span.end - marker;
        let bytes = text.as_bytes();
        while end > self.span.start && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        end
    }
}

fn is_name_boundary(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

/// Offset of the next `<name` opening tag within `[from, end)`.
/// `<SoundX` does not match `Sound`.
pub fn find_open_tag(text: &str, from: usize, end: usize, name: &str) -> Option<usize> {
    let needle = format!("<{}", name);
    let bytes = text.as_bytes();
    let mut cursor = from;
    while cursor < end {
        let found = cursor + text.get(cursor..end)?.find(&needle)?;
        let after = found + needle.len();
        if after >= end {
            return None;
        }
        if is_name_boundary(bytes[after]) {
            return Some(found);
        }
        cursor = found + 1;
    }
    None
}

/// Range of the next `</name>` closing tag within `[from, end)`,
/// tolerating whitespace before the `>`.
pub fn find_close_tag(text: &str, from: usize, end: usize, name: &str) -> Option<Range<usize>> {
    let needle = format!("</{}", name);
    let bytes = text.as_bytes();
    let mut cursor = from;
    while cursor < end {
        let found = cursor + text.get(cursor..end)?.find(&needle)?;
        let mut after = found + needle.len();
        while after < end && bytes[after].is_ascii_whitespace() {
            after += 1;
        }
        if after < end && bytes[after] == b'>' {
            return Some(found..after + 1);
        }
        cursor = found + 1;
    }
    None
}

/// Offset just past the `>` that closes the tag opened at `start`.
/// A quote only opens a value when it directly follows `=`, so a stray
/// apostrophe in an unquoted value does not swallow the rest of the file.
pub fn tag_end(text: &str, start: usize, end: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut quote: Option<u8> = None;
    let mut last_significant = 0u8;
    for i in (start + 1)..end {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                    last_significant = b;
                }
            }
            None => {
                if b == b'>' {
                    return Some(i + 1);
                }
                if (b == b'"' || b == b'\'') && last_significant == b'=' {
                    quote = Some(b);
                }
                if !b.is_ascii_whitespace() {
                    last_significant = b;
                }
            }
        }
    }
    None
}

/// Parse the tag that opens at `start` (which must point at `<`).
pub fn read_tag(text: &str, start: usize, end: usize) -> Option<Tag> {
    let bytes = text.as_bytes();
    if bytes.get(start) != Some(&b'<') {
        return None;
    }
    let close = tag_end(text, start, end)?;
    let mut name_end = start + 1;
    while name_end < close && !is_name_boundary(bytes[name_end]) {
        name_end += 1;
    }
    let name = text[start + 1..name_end].to_string();
    let self_closing = close >= 2 && bytes[close - 2] == b'/';
    let attrs_end = if self_closing { close - 2 } else { close - 1 };
    let attrs = parse_attributes(text, name_end..attrs_end.max(name_end));
    Some(Tag {
        name,
        span: start..close,
        attrs,
        self_closing,
    })
}

/// Every opening tag named `name` inside `span`, regardless of nesting.
pub fn scan_tags(text: &str, span: Range<usize>, name: &str) -> Vec<Tag> {
    let mut tags = Vec::new();
    let mut cursor = span.start;
    while let Some(start) = find_open_tag(text, cursor, span.end, name) {
        match read_tag(text, start, span.end) {
            Some(tag) => {
                cursor = tag.span.end;
                tags.push(tag);
            }
            None => break,
        }
    }
    tags
}

/// Read `name="v"`, `name='v'` and `name=v` pairs out of `range`.
pub fn parse_attributes(text: &str, range: Range<usize>) -> Attributes {
    let bytes = text.as_bytes();
    let end = range.end;
    let mut i = range.start;
    let mut attrs = Vec::new();

    while i < end {
        while i < end && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= end {
            break;
        }

        let name_start = i;
        while i < end && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/' {
            i += 1;
        }
        let name = text[name_start..i].to_string();

        let mut j = i;
        while j < end && bytes[j].is_ascii_whitespace() {
            j += 1;
        }
        if j >= end || bytes[j] != b'=' {
            // Bare attribute
            attrs.push(Attribute {
                name,
                value: String::new(),
                span: name_start..i,
            });
            continue;
        }
        j += 1;
        while j < end && bytes[j].is_ascii_whitespace() {
            j += 1;
        }

        let (raw, value_end) = if j < end && (bytes[j] == b'"' || bytes[j] == b'\'') {
            let quote = bytes[j];
            let value_start = j + 1;
            let mut k = value_start;
            while k < end && bytes[k] != quote {
                k += 1;
            }
            (&text[value_start..k], (k + 1).min(end))
        } else {
            let value_start = j;
            let mut k = value_start;
            while k < end && !bytes[k].is_ascii_whitespace() {
                k += 1;
            }
            (&text[value_start..k], k)
        };

        attrs.push(Attribute {
            name,
            value: decode_entities(raw),
            span: name_start..value_end,
        });
        i = value_end;
    }

    Attributes(attrs)
}

/// Decode the five standard entities plus decimal/hex character references.
/// Anything unrecognised is left as written.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let candidate = &rest[amp..];
        let decoded = candidate[1..]
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| {
                let entity = &candidate[1..semi + 1];
                decode_entity(entity).map(|c| (c, semi + 2))
            });
        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &candidate[consumed..];
            }
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let numeric = entity.strip_prefix('#')?;
            let code = match numeric.strip_prefix('x').or_else(|| numeric.strip_prefix('X')) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => numeric.parse::<u32>().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Escape a value for a double-quoted attribute.
pub fn escape_attr(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Whitespace between the start of the line holding `pos` and `pos`, if
/// that stretch is nothing but whitespace.
pub fn line_indent(text: &str, pos: usize) -> Option<&str> {
    let line_start = text[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let prefix = &text[line_start..pos];
    if prefix.chars().all(|c| c == ' ' || c == '\t') {
        Some(prefix)
    } else {
        None
    }
}
