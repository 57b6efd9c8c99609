//! Character classification and token boundary primitives.
//!
//! The scanner works directly over the source text and never allocates.
//! Token boundaries come from a fixed separator set: every byte up to and
//! including `,` except `$` and `#`, plus the range `:`..=`>`. Everything
//! else, notably letters, digits, `@`, `_`, `?` and `.`, is a token
//! constituent, which lets ordinal markers (`@12`), forward targets
//! (`kernel32.CreateFileA`) and C++ mangled names (`?Name@@YAXXZ`) scan as
//! single tokens.

/// Returns `true` if the byte ends a token.
///
/// The end of the buffer behaves as a separator everywhere below.
pub(crate) fn is_separator(byte: u8) -> bool {
    (byte <= b',' && byte != b'$' && byte != b'#') || (b':'..=b'>').contains(&byte)
}

/// Number of token constituent bytes at the start of `s`.
pub(crate) fn token_length(s: &str) -> usize {
    s.bytes().take_while(|&b| !is_separator(b)).count()
}

/// The token at the start of `s`. Empty if `s` starts with a separator.
pub(crate) fn token(s: &str) -> &str {
    &s[..token_length(s)]
}

/// Keyword comparison with separator lookahead.
///
/// `s` matches `keyword` when it starts with it verbatim and the match ends
/// on a token boundary: either the keyword's own final byte is a separator
/// (option prefixes such as `-arch=`) or the byte of `s` following the match
/// is a separator or the end of the buffer. This keeps `stdcall` from
/// matching a prefix of `stdcallx`.
pub(crate) fn matches_keyword(s: &str, keyword: &str) -> bool {
    if !s.starts_with(keyword) {
        return false;
    }

    if keyword.as_bytes().last().is_some_and(|&b| is_separator(b)) {
        return true;
    }

    s.as_bytes()
        .get(keyword.len())
        .is_none_or(|&b| is_separator(b))
}

/// Searches for `byte` within the current token only.
///
/// Returns the offset of the first occurrence, or `None` if a separator or
/// the end of the buffer is reached first.
pub(crate) fn scan_token(s: &str, byte: u8) -> Option<usize> {
    s.bytes()
        .take_while(|&b| !is_separator(b))
        .position(|b| b == byte)
}

/// Offset of the next token on the line.
///
/// Skips the remainder of the current token, then a run of spaces and tabs.
/// Returns `None` at end of line, end of buffer, or a comment marker
/// (`#` or `;`).
pub(crate) fn next_token(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut pos = token_length(s);

    while matches!(bytes.get(pos), Some(b' ') | Some(b'\t')) {
        pos += 1;
    }

    match bytes.get(pos) {
        None | Some(b'\n') | Some(b'\r') | Some(b'#') | Some(b';') => None,
        Some(_) => Some(pos),
    }
}

/// Offset just past the current line's terminator.
///
/// Accepts `\n`, `\n\r`, or the end of the buffer.
pub(crate) fn next_line(s: &str) -> usize {
    let bytes = s.as_bytes();

    let mut pos = 0;
    while pos < bytes.len() {
        if bytes[pos] == b'\n' {
            return if bytes.get(pos + 1) == Some(&b'\r') {
                pos + 2
            } else {
                pos + 1
            };
        }
        pos += 1;
    }

    pos
}
