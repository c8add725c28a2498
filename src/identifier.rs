//! Catalog identifier extraction from video filenames.
//!
//! Catalog codes look like `ABW-255` or `FJIN_098`: two to ten letters, a
//! dash or underscore, two to five digits, and an optional trailing letter.
//! A code wrapped in square brackets is taken as authoritative; otherwise the
//! last code in the name wins, since codes conventionally trail other
//! metadata such as dates or release-group tags.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static BRACKETED_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"\[([A-Za-z]{2,10}[-_]\d{2,5}[A-Za-z]?)\]"));

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"[A-Za-z]{2,10}[-_]\d{2,5}[A-Za-z]?"));

/// Extracts the catalog identifier from a filename.
///
/// Returns the identifier with its original casing, or `None` when the name
/// carries no recognizable code.
///
/// # Example
///
/// ```
/// use subgrab_core::identifier::extract;
///
/// assert_eq!(extract("[ABW-255].mp4").as_deref(), Some("ABW-255"));
/// assert_eq!(extract("2022-07-08 - Name - ABW-255.mp4").as_deref(), Some("ABW-255"));
/// assert_eq!(extract("no_code_here.mp4"), None);
/// ```
#[must_use]
pub fn extract(filename: &str) -> Option<String> {
    if let Some(caps) = BRACKETED_CODE_RE.captures(filename) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }

    CODE_RE
        .find_iter(filename)
        .last()
        .map(|m| m.as_str().to_string())
}

/// Extracts the identifier from the file name component of `path`.
///
/// Parent directory names are ignored.
#[must_use]
pub fn extract_from_path(path: &Path) -> Option<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(extract)
}

/// Compares two identifiers case-insensitively.
#[must_use]
pub fn identifiers_match(lhs: &str, rhs: &str) -> bool {
    lhs.eq_ignore_ascii_case(rhs)
}

/// Canonical key for case-insensitive lookups.
#[must_use]
pub fn normalized_key(identifier: &str) -> String {
    identifier.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_bracketed_code() {
        assert_eq!(extract("[ABW-255].mp4").as_deref(), Some("ABW-255"));
    }

    #[test]
    fn test_extract_after_site_prefix() {
        assert_eq!(
            extract("hhd800.com@FJIN-098.mp4").as_deref(),
            Some("FJIN-098")
        );
    }

    #[test]
    fn test_extract_ignores_leading_date() {
        assert_eq!(
            extract("2022-07-08 - Name - ABW-255.mp4").as_deref(),
            Some("ABW-255")
        );
    }

    #[test]
    fn test_extract_no_code_returns_none() {
        assert_eq!(extract("no_code_here.mp4"), None);
        assert_eq!(extract(""), None);
    }

    #[test]
    fn test_extract_prefers_bracketed_over_trailing() {
        assert_eq!(
            extract("[SSIS-001] remaster ABP-123.mkv").as_deref(),
            Some("SSIS-001")
        );
    }

    #[test]
    fn test_extract_returns_last_unbracketed_match() {
        assert_eq!(extract("ABC-111 vs XYZ-222.mp4").as_deref(), Some("XYZ-222"));
    }

    #[test]
    fn test_extract_underscore_and_suffix_letter() {
        assert_eq!(extract("mide_123c.avi").as_deref(), Some("mide_123c"));
    }

    #[test]
    fn test_extract_preserves_case() {
        assert_eq!(extract("abw-255.mp4").as_deref(), Some("abw-255"));
    }

    #[test]
    fn test_extract_bracket_with_invalid_code_falls_back() {
        // Bracket holds no code, so the unbracketed scan applies.
        assert_eq!(extract("[1080p] ABW-255.mp4").as_deref(), Some("ABW-255"));
    }

    #[test]
    fn test_extract_from_path_uses_file_name_only() {
        let path = Path::new("/videos/ABC-999/clip.mp4");
        assert_eq!(extract_from_path(path), None);

        let path = Path::new("/videos/misc/[ABW-255].mp4");
        assert_eq!(extract_from_path(path).as_deref(), Some("ABW-255"));
    }

    #[test]
    fn test_identifiers_match_case_insensitive() {
        assert!(identifiers_match("abw-255", "ABW-255"));
        assert!(!identifiers_match("ABW-255", "ABW-256"));
    }

    #[test]
    fn test_normalized_key_uppercases_and_trims() {
        assert_eq!(normalized_key(" abw-255 "), "ABW-255");
    }
}
