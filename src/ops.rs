//! Pure byte transformations backing the node variants.
//!
//! Values are raw byte strings. All offsets and lengths are measured in bytes,
//! and case conversion only touches ASCII letters.

use crate::CaseMode;

/// Half-open byte slice `[start, min(end, len))` of `input`.
///
/// Returns an empty value if `start` is past the end or if the clamped end
/// falls before `start`. A slice may cut through a multi-byte sequence; the
/// bytes are kept as they are.
pub fn substring(input: &[u8], start: usize, end: usize) -> Vec<u8> {
    if start >= input.len() {
        return Vec::new();
    }
    let end = end.min(input.len()).max(start);
    input[start..end].to_vec()
}

/// Replaces every non-overlapping occurrence of `old` with `new`, scanning left
/// to right and resuming after each replacement.
///
/// An empty `old` leaves the input unchanged.
pub fn replace(input: &[u8], old: &[u8], new: &[u8]) -> Vec<u8> {
    if old.is_empty() {
        return input.to_vec();
    }
    let mut out = Vec::with_capacity(input.len());
    let mut rest = input;
    while let Some(at) = find(rest, old) {
        out.extend_from_slice(&rest[..at]);
        out.extend_from_slice(new);
        rest = &rest[at + old.len()..];
    }
    out.extend_from_slice(rest);
    out
}

/// Returns true if `pattern` occurs contiguously in `input`. The empty pattern always matches.
pub fn contains(input: &[u8], pattern: &[u8]) -> bool {
    find(input, pattern).is_some()
}

/// Maps every ASCII letter through the case transform selected by `mode`.
pub fn convert_case(input: &[u8], mode: &CaseMode) -> Vec<u8> {
    match mode {
        CaseMode::Upper => input.to_ascii_uppercase(),
        CaseMode::Lower => input.to_ascii_lowercase(),
        CaseMode::Other(_) => input.to_vec(),
    }
}

/// Length of `input` in bytes.
pub fn byte_length(input: &[u8]) -> usize {
    input.len()
}

/// Renders a boolean the way pattern matching nodes report it.
pub(crate) fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
