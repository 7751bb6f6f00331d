//! Email format validation shared by the contact and newsletter handlers.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// Returns true if the string looks like a deliverable email address.
///
/// Intentionally loose: one `@`, no whitespace, a dot in the domain.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}
