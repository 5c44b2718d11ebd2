//! Table selection: include/exclude lists with `*`/`?` glob patterns.
//!
//! The effective set starts from all source tables, intersects with the
//! include list when non-empty, then subtracts the exclude list. Patterns
//! that match nothing produce warnings, never errors. Matching is
//! case-sensitive, following source identifier rules.

/// Match `name` against `pattern`, where `*` matches any run of characters
/// and `?` matches exactly one.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let mut pi = 0;
    let mut ni = 0;
    let mut star: Option<usize> = None;
    let mut mark = 0;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ni;
            pi += 1;
        } else if let Some(star_pos) = star {
            // Backtrack: let the last * swallow one more character.
            pi = star_pos + 1;
            mark += 1;
            ni = mark;
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

/// Result of resolving the selection against the live table list.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Selected table names, in the order they appear in `all`.
    pub selected: Vec<String>,

    /// Patterns that matched nothing.
    pub warnings: Vec<String>,
}

/// Resolve include/exclude patterns against the full table list.
pub fn resolve(all: &[String], include: &[String], exclude: &[String]) -> Selection {
    let mut warnings = Vec::new();

    let included: Vec<&String> = if include.is_empty() {
        all.iter().collect()
    } else {
        for pattern in include {
            if !all.iter().any(|t| wildcard_match(pattern, t)) {
                warnings.push(format!("include pattern '{}' selects no tables", pattern));
            }
        }
        all.iter()
            .filter(|t| include.iter().any(|p| wildcard_match(p, t)))
            .collect()
    };

    for pattern in exclude {
        if !all.iter().any(|t| wildcard_match(pattern, t)) {
            warnings.push(format!("exclude pattern '{}' matches no tables", pattern));
        }
    }

    let selected = included
        .into_iter()
        .filter(|t| !exclude.iter().any(|p| wildcard_match(p, t)))
        .cloned()
        .collect();

    Selection { selected, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_wildcard_literal() {
        assert!(wildcard_match("users", "users"));
        assert!(!wildcard_match("users", "user"));
        assert!(!wildcard_match("user", "users"));
    }

    #[test]
    fn test_wildcard_star_prefix() {
        assert!(wildcard_match("user_*", "user_profiles"));
        assert!(wildcard_match("user_*", "user_settings"));
        assert!(!wildcard_match("user_*", "superuser"));
    }

    #[test]
    fn test_wildcard_star_suffix() {
        assert!(wildcard_match("*_log", "access_log"));
        assert!(!wildcard_match("*_log", "logger"));
    }

    #[test]
    fn test_wildcard_question_mark() {
        assert!(wildcard_match("t?mp", "temp"));
        assert!(wildcard_match("t?mp", "tamp"));
        assert!(!wildcard_match("t?mp", "tmp"));
        assert!(!wildcard_match("t?mp", "teemp"));
    }

    #[test]
    fn test_wildcard_multiple_stars() {
        assert!(wildcard_match("*user*", "superuser_log"));
        assert!(wildcard_match("a*b*c", "aXXbYYc"));
        assert!(!wildcard_match("a*b*c", "aXXcYYb"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*", ""));
    }

    #[test]
    fn test_wildcard_case_sensitive() {
        assert!(!wildcard_match("Users", "users"));
    }

    #[test]
    fn test_resolve_empty_include_selects_all() {
        let all = names(&["a", "b", "c"]);
        let selection = resolve(&all, &[], &[]);
        assert_eq!(selection.selected, all);
        assert!(selection.warnings.is_empty());
    }

    #[test]
    fn test_resolve_include_exclude() {
        // tables=["user_*"], exclude=["*_log"] against
        // {user_profile, user_log, order} selects only user_profile
        let all = names(&["order", "user_log", "user_profile"]);
        let selection = resolve(&all, &names(&["user_*"]), &names(&["*_log"]));
        assert_eq!(selection.selected, names(&["user_profile"]));
    }

    #[test]
    fn test_resolve_unknown_pattern_warns() {
        let all = names(&["users"]);
        let selection = resolve(&all, &names(&["missing_*"]), &[]);
        assert!(selection.selected.is_empty());
        assert_eq!(selection.warnings.len(), 1);
        assert!(selection.warnings[0].contains("missing_*"));
    }

    #[test]
    fn test_resolve_preserves_order_and_dedups() {
        let all = names(&["a1", "b1", "a2"]);
        let selection = resolve(&all, &names(&["a*", "a1"]), &[]);
        assert_eq!(selection.selected, names(&["a1", "a2"]));
    }
}
