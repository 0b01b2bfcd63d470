//! Text normalization and shape checks shared by the service layer.

/// Uppercases the first character of `value`, leaving the rest untouched.
///
/// Examples:
/// - "john" -> "John"
/// - "éclair" -> "Éclair"
/// - "" -> ""
#[must_use]
pub fn capitalize_first(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Returns true if `value` is non-empty and only contains ASCII letters,
/// digits and underscores.
#[must_use]
pub fn is_valid_user_name(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Loose email shape check: one `@`, a non-empty local part, and a domain
/// with at least one inner dot. Deliverability is proven by the
/// confirmation link, not here.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && domain
            .split_once('.')
            .is_some_and(|(head, tail)| !head.is_empty() && !tail.is_empty())
        && !domain.ends_with('.')
}
