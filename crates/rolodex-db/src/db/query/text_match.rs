//! Case-insensitive substring matching helpers for `ILIKE` predicates.

/// ## Summary
/// Escapes special SQL LIKE/ILIKE pattern characters.
///
/// Escapes `%`, `_`, and `\` so they match literally.
#[must_use]
pub fn escape_like_pattern(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '%' | '_' | '\\' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

/// ## Summary
/// Builds an `ILIKE` pattern that matches any value containing `value`.
#[must_use]
pub fn contains_pattern(value: &str) -> String {
    format!("%{}%", escape_like_pattern(value))
}
