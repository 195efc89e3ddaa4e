//! Whitespace and zero-width cleanup for extracted text.

const ZERO_WIDTH: [char; 3] = ['\u{200B}', '\u{200C}', '\u{200D}'];

/// Collapses whitespace runs into one space, trims, and drops zero-width
/// space/non-joiner/joiner characters.
///
/// Zero-width characters go first, so `" \u{200B} "` collapses to a single space.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars().filter(|c| !ZERO_WIDTH.contains(c)) {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }

    out
}

pub fn normalize_opt(text: Option<&str>) -> Option<String> {
    text.map(normalize)
}
