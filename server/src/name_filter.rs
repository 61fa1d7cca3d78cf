use shared::{FALLBACK_NAME, MAX_NAME_LEN};

/// Substrings that turn a requested name into the fallback name.
const BLOCKLIST: [&str; 7] = [
    "nigger", "fuck", "shit", "bitch", "cunt", "asshole", "retard",
];

/// Best-effort display name filter.
///
/// Matching runs on the trimmed, lower-cased input. A hit yields
/// [`FALLBACK_NAME`]; otherwise the input as sent is cut to
/// [`MAX_NAME_LEN`] characters.
pub fn filter_name(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();
    if BLOCKLIST.iter().any(|word| cleaned.contains(word)) {
        return FALLBACK_NAME.to_string();
    }
    raw.chars().take(MAX_NAME_LEN).collect()
}
