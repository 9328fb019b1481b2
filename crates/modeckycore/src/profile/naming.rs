//! Profile name rules.

/// Prefix for generated profile names ("Profile 1", "Profile 2", ...).
pub const GENERATED_PREFIX: &str = "Profile";

/// Trim a proposed name. Returns `None` when nothing is left.
pub fn clean_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Generate "Profile N" with the smallest N >= 1 not already taken.
pub fn generate_name<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let taken: std::collections::HashSet<&str> = existing.into_iter().collect();
    (1..)
        .map(|n| format!("{GENERATED_PREFIX} {n}"))
        .find(|candidate| !taken.contains(candidate.as_str()))
        .unwrap_or_else(|| GENERATED_PREFIX.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_name() {
        assert_eq!(clean_name("  Default "), Some("Default".to_string()));
        assert_eq!(clean_name(""), None);
        assert_eq!(clean_name(" \t "), None);
    }

    #[test]
    fn test_generate_name_smallest_unused() {
        assert_eq!(generate_name([]), "Profile 1");
        assert_eq!(generate_name(["Profile 1", "Profile 2"]), "Profile 3");
        assert_eq!(generate_name(["Profile 2", "Default"]), "Profile 1");
        assert_eq!(generate_name(["Profile 1", "Profile 3"]), "Profile 2");
        // Only exact matches count
        assert_eq!(generate_name(["profile 1"]), "Profile 1");
    }
}
