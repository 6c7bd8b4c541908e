/// Separator between code and revision inside a comparison key.
pub const KEY_SEPARATOR: &str = "::";

/// Comparison key for a row. With revisions honoured, a missing revision
/// and an empty one share the key `"code::"`.
pub fn key_of(code: &str, revision: Option<&str>, ignore_revision: bool) -> String {
    if ignore_revision {
        code.to_string()
    } else {
        format!("{code}{KEY_SEPARATOR}{}", revision.unwrap_or(""))
    }
}
