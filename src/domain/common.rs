//! Common helpers for domain models

use uuid::Uuid;

// Every run of characters outside the slug alphabet collapses to one separator
lazy_static::lazy_static! {
    static ref NON_SLUG_CHARS: regex::Regex = regex::Regex::new(r"[^a-z0-9]+").unwrap();
}

/// Derive a domain identifier from a human readable name.
///
/// Lowercases the name, replaces every run of characters outside `[a-z0-9]`
/// with a single `-` and trims separators at both ends. The function is
/// deterministic, so two names that slug to the same value collide on
/// creation.
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    NON_SLUG_CHARS
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Generate an identifier for a stored resource
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
