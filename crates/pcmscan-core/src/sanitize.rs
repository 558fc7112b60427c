//! Filename sanitization for the export step

/// Characters Windows refuses in file names.
const ILLEGAL: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Strip filesystem-illegal characters from a name component.
///
/// An input that is empty (or becomes empty after stripping) turns into the
/// literal placeholder "Unknown" so the export template never produces a
/// nameless segment.
pub fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| !ILLEGAL.contains(c)).collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        "Unknown".to_string()
    } else {
        cleaned.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_illegal_characters() {
        assert_eq!(sanitize_filename("P/100"), "P100");
        assert_eq!(sanitize_filename("Acme:Corp"), "AcmeCorp");
        assert_eq!(sanitize_filename(r#"a\b/c*d?e:f"g<h>i|j"#), "abcdefghij");
    }

    #[test]
    fn test_passthrough() {
        assert_eq!(sanitize_filename("P-1051 rev2"), "P-1051 rev2");
    }

    #[test]
    fn test_empty_becomes_unknown() {
        assert_eq!(sanitize_filename(""), "Unknown");
        assert_eq!(sanitize_filename("   "), "Unknown");
        assert_eq!(sanitize_filename(r"\/:*?"), "Unknown");
    }
}
