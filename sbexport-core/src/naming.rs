//! Payload filename derivation
//!
//! Extracted scripts are written out as `.cs` files named after the node's
//! `name` field. Names coming out of exports can contain anything, so they
//! are reduced to a filesystem-safe subset, and collisions are disambiguated
//! with the running record counter. The counter is the number of records
//! already produced overall, not a per-basename counter, so a second `Test`
//! extracted after three other scripts becomes `Test_4.cs`. Existing project
//! folders rely on these exact names, so the scheme must not change.

/// File extension appended to every extracted payload.
pub const SCRIPT_EXTENSION: &str = ".cs";

/// Reduce a script name to alphanumerics, spaces, underscores and hyphens,
/// trimming surrounding whitespace.
pub fn sanitize_script_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Derive the output filename for the next payload record.
///
/// `name` is the node's `name` field, if present and non-empty; `count` is
/// the number of records already produced; `taken` reports whether a
/// candidate filename is already in use.
pub fn derive_filename(name: Option<&str>, count: usize, taken: impl Fn(&str) -> bool) -> String {
    let base = match name {
        Some(name) if !name.is_empty() => sanitize_script_name(name),
        _ => format!("script_{}", count),
    };

    let candidate = format!("{}{}", base, SCRIPT_EXTENSION);
    if taken(&candidate) {
        format!("{}_{}{}", base, count, SCRIPT_EXTENSION)
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_keeps_safe_characters() {
        assert_eq!(sanitize_script_name("Add Points"), "Add Points");
        assert_eq!(sanitize_script_name("my_script-v2"), "my_script-v2");
    }

    #[test]
    fn test_sanitize_strips_specials() {
        assert_eq!(sanitize_script_name("Timer: <Main>"), "Timer Main");
        assert_eq!(sanitize_script_name("a/b\\c*d?e"), "abcde");
    }

    #[test]
    fn test_sanitize_trims_whitespace() {
        assert_eq!(sanitize_script_name("  Points!  "), "Points");
    }

    #[test]
    fn test_sanitize_all_specials_yields_empty() {
        assert_eq!(sanitize_script_name("!!!"), "");
    }

    #[test]
    fn test_derive_simple() {
        assert_eq!(derive_filename(Some("Test"), 0, |_| false), "Test.cs");
    }

    #[test]
    fn test_derive_all_special_name_yields_bare_extension() {
        // A non-empty name that sanitizes to nothing keeps its (empty) base;
        // the synthetic fallback only applies to absent or empty raw names.
        assert_eq!(derive_filename(Some("!!!"), 0, |_| false), ".cs");
    }

    #[test]
    fn test_derive_missing_name_is_synthetic() {
        assert_eq!(derive_filename(None, 3, |_| false), "script_3.cs");
        assert_eq!(derive_filename(Some(""), 0, |_| false), "script_0.cs");
    }

    #[test]
    fn test_derive_collision_uses_record_counter() {
        // Second "Test" arriving as the 5th record overall.
        let name = derive_filename(Some("Test"), 4, |f| f == "Test.cs");
        assert_eq!(name, "Test_4.cs");
    }

    #[test]
    fn test_no_collision_between_distinct_bases() {
        assert_eq!(derive_filename(Some("Test2"), 1, |f| f == "Test.cs"), "Test2.cs");
    }
}
