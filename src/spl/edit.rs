//! The one place soundlist text is re-emitted. Mutators describe their
//! changes as splices against offsets of the text they parsed; `apply`
//! rebuilds the whole document in a single pass.

use crate::error::{PlayerError, Result};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Splice {
    pub range: Range<usize>,
    pub text: String,
}

impl Splice {
    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self {
            range: at..at,
            text: text.into(),
        }
    }

    pub fn replace(range: Range<usize>, text: impl Into<String>) -> Self {
        Self {
            range,
            text: text.into(),
        }
    }

    pub fn remove(range: Range<usize>) -> Self {
        Self {
            range,
            text: String::new(),
        }
    }
}

/// Apply splices computed against `original`. An insertion that shares its
/// offset with the start of a removal lands in front of it.
pub fn apply(original: &str, mut splices: Vec<Splice>) -> Result<String> {
    splices.sort_by_key(|s| (s.range.start, s.range.end));

    let added: usize = splices.iter().map(|s| s.text.len()).sum();
    let mut out = String::with_capacity(original.len() + added);
    let mut cursor = 0;
    for splice in &splices {
        if splice.range.start < cursor || splice.range.end > original.len() {
            return Err(PlayerError::malformed(format!(
                "overlapping edit at {}..{}",
                splice.range.start, splice.range.end
            )));
        }
        out.push_str(&original[cursor..splice.range.start]);
        out.push_str(&splice.text);
        cursor = splice.range.end;
    }
    out.push_str(&original[cursor..]);
    Ok(out)
}

/// Widen the span of an element so removing it also takes its indentation
/// and line break when it sits alone on its line.
pub fn whole_line(text: &str, span: Range<usize>) -> Range<usize> {
    let bytes = text.as_bytes();
    let mut start = span.start;
    while start > 0 && (bytes[start - 1] == b' ' || bytes[start - 1] == b'\t') {
        start -= 1;
    }
    let at_line_start = start == 0 || bytes[start - 1] == b'\n';
    if !at_line_start {
        return span;
    }

    let mut end = span.end;
    while end < bytes.len() && (bytes[end] == b' ' || bytes[end] == b'\t') {
        end += 1;
    }
    if bytes.get(end) == Some(&b'\r') && bytes.get(end + 1) == Some(&b'\n') {
        start..end + 2
    } else if bytes.get(end) == Some(&b'\n') {
        start..end + 1
    } else {
        span
    }
}
