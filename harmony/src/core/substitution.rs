//! Capture value markers: `[name]` substitution and quoted literals.

const QUOTE_CHARS: [char; 4] = ['"', '\'', '[', ']'];

/// How a raw capture value is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureValue<'a> {
    /// `[name]`: look `name` up in the scope stack.
    Variable(&'a str),
    /// Quoted (or bare) literal with delimiters removed.
    Literal(&'a str),
}

/// Classify a raw capture value.
pub fn parse_capture(raw: &str) -> CaptureValue<'_> {
    if is_substitution(raw) {
        CaptureValue::Variable(unquote(raw))
    } else {
        CaptureValue::Literal(unquote(raw))
    }
}

pub fn is_substitution(raw: &str) -> bool {
    raw.len() >= 2 && raw.starts_with('[') && raw.ends_with(']')
}

/// Strip one pair of surrounding delimiters.
///
/// Both ends must be one of `"`, `'`, `[`, `]`; the two need not match.
pub fn unquote(raw: &str) -> &str {
    let mut chars = raw.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last)) if QUOTE_CHARS.contains(&first) && QUOTE_CHARS.contains(&last) => {
            &raw[first.len_utf8()..raw.len() - last.len_utf8()]
        }
        _ => raw,
    }
}
