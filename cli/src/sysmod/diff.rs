//! Unified diffs for previewing system file changes.
use similar::TextDiff;

/// Lines of context around each hunk.
const CONTEXT_LINES: usize = 3;

/// Whether `bytes` should be treated as binary (invalid UTF-8 or NUL bytes).
#[must_use]
pub fn is_binary(bytes: &[u8]) -> bool {
    bytes.contains(&0) || std::str::from_utf8(bytes).is_err()
}

/// Render a unified diff from `old` to `new`.
///
/// Returns an empty string when the contents are equal and a one-line note
/// when either side is binary.
#[must_use]
pub fn unified_diff(old: &[u8], new: &[u8], old_label: &str, new_label: &str) -> String {
    if old == new {
        return String::new();
    }
    if is_binary(old) || is_binary(new) {
        return format!("binary content differs: {old_label} -> {new_label}\n");
    }
    let old_text = String::from_utf8_lossy(old);
    let new_text = String::from_utf8_lossy(new);

    TextDiff::from_lines(old_text.as_ref(), new_text.as_ref())
        .unified_diff()
        .context_radius(CONTEXT_LINES)
        .header(old_label, new_label)
        .to_string()
}
