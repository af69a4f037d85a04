/// Normalize a human-readable name into a Healthchecks slug.
///
/// When `suffix` is non-empty it is appended after a single space, so the
/// per-host suffix goes through the same normalization as the name itself.
/// Spaces become double underscores, periods become hyphens, and anything
/// outside `[A-Za-z0-9_-]` becomes a single underscore. The result is safe
/// to use as a URL path segment.
pub fn slugify(text: &str, suffix: &str) -> String {
    let combined = if suffix.is_empty() {
        text.to_string()
    } else {
        format!("{text} {suffix}")
    };

    combined
        .replace(' ', "__")
        .replace('.', "-")
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_output_charset() {
        let slug = slugify("Daily Backup #7 (weekly)", "node1.clusterA.example-com");
        assert!(slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-'));
    }

    #[test]
    fn test_slugify_known_value() {
        assert_eq!(
            slugify("Daily Backup", "node1.clusterA.example-com"),
            "Daily__Backup__node1-clusterA-example-com"
        );
    }

    #[test]
    fn test_slugify_is_idempotent_on_own_output() {
        let once = slugify("pve1.standalone.local job", "");
        let twice = slugify(&once, "");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_slugify_empty_inputs() {
        assert_eq!(slugify("", ""), "");
        assert_eq!(slugify("", "host.cluster.local"), "__host-cluster-local");
    }

    #[test]
    fn test_slugify_replaces_disallowed_characters() {
        assert_eq!(slugify("a/b:c", ""), "a_b_c");
    }
}
