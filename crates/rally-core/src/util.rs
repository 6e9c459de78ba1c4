//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Whether `id` looks like a remote-assigned identifier.
///
/// Canonical ids are 36 characters of hex split 8-4-4-4-12 by hyphens.
/// Anything else is a local placeholder that the remote has never seen.
pub fn is_canonical_id(id: &str) -> bool {
    const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

    if id.len() != 36 {
        return false;
    }

    let mut parts = id.split('-');
    for expected in GROUPS {
        match parts.next() {
            Some(part) if part.len() == expected && part.bytes().all(|b| b.is_ascii_hexdigit()) => {}
            _ => return false,
        }
    }
    parts.next().is_none()
}

/// Generate an opaque local id, used until the remote assigns a canonical one.
pub fn local_id() -> String {
    format!("local-{}", uuid::Uuid::now_v7().simple())
}
