//! Text normalization applied to extracted text before chunking.

/// Clean extracted text.
///
/// Runs of whitespace (including line breaks) collapse to a single space, then
/// everything outside printable ASCII is dropped. `\n` and `\r` are on the keep
/// list for the second pass, but the collapse pass has already folded them into
/// spaces, so the result is a single line. Leading and trailing whitespace is trimmed.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut collapsed = String::with_capacity(text.len());
    let mut in_whitespace = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_whitespace {
                collapsed.push(' ');
                in_whitespace = true;
            }
        } else {
            collapsed.push(c);
            in_whitespace = false;
        }
    }

    let printable: String = collapsed
        .chars()
        .filter(|&c| matches!(c, ' '..='~' | '\n' | '\r'))
        .collect();

    printable.trim().to_string()
}
