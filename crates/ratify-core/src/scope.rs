//! Plan scope matching: literal path prefixes and `*`/`**` globs.

use crate::summary::normalize_path;
use regex::Regex;

#[derive(Debug, Clone)]
enum ScopeEntry {
    Pattern(Regex),
    Literal(String),
}

impl ScopeEntry {
    fn matches(&self, path: &str) -> bool {
        match self {
            ScopeEntry::Pattern(re) => re.is_match(path),
            ScopeEntry::Literal(entry) => {
                path == entry
                    || path.starts_with(&format!("{entry}/"))
                    || (entry.ends_with('/') && path.starts_with(entry.as_str()))
            }
        }
    }
}

/// Translate a scope glob into an anchored regex.
///
/// `**` matches any sequence including `/`; a lone `*` stops at `/`.
/// Every other character is matched literally.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        if c == '*' {
            if chars.peek() == Some(&'*') {
                chars.next();
                out.push_str(".*");
            } else {
                out.push_str("[^/]*");
            }
        } else {
            out.push_str(&regex::escape(c.encode_utf8(&mut buf)));
        }
    }
    out.push('$');
    out
}

/// Compiled scope of an active plan.
#[derive(Debug, Clone, Default)]
pub struct ScopeMatcher {
    entries: Vec<ScopeEntry>,
    declared: bool,
}

impl ScopeMatcher {
    /// Compile raw scope items. Blank items match nothing, but a non-empty
    /// list still restricts.
    pub fn compile<S: AsRef<str>>(items: &[S]) -> Self {
        let mut entries = Vec::new();
        for item in items {
            let entry = normalize_path(item.as_ref());
            if entry.is_empty() {
                continue;
            }
            if entry.contains('*') {
                match Regex::new(&glob_to_regex(&entry)) {
                    Ok(re) => entries.push(ScopeEntry::Pattern(re)),
                    Err(e) => tracing::warn!(entry = %entry, error = %e, "skipping scope entry"),
                }
            } else {
                entries.push(ScopeEntry::Literal(entry));
            }
        }
        Self {
            entries,
            declared: !items.is_empty(),
        }
    }

    /// True when no scope items were given at all.
    pub fn is_unrestricted(&self) -> bool {
        !self.declared
    }

    /// `None` means "no restriction"; `Some(false)` means out of scope.
    pub fn matches(&self, path: &str) -> Option<bool> {
        if self.is_unrestricted() {
            return None;
        }
        let path = normalize_path(path);
        Some(self.entries.iter().any(|e| e.matches(&path)))
    }

    /// Paths whose match result is explicitly `false`.
    pub fn out_of_scope<'a, I>(&self, paths: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        paths
            .into_iter()
            .filter(|p| self.matches(p) == Some(false))
            .map(normalize_path)
            .collect()
    }
}

/// One-shot form of [`ScopeMatcher::matches`].
pub fn matches_scope<S: AsRef<str>>(path: &str, scope_items: &[S]) -> Option<bool> {
    if scope_items.is_empty() {
        return None;
    }
    ScopeMatcher::compile(scope_items).matches(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_star_crosses_separators() {
        let m = ScopeMatcher::compile(&["src/**/*.ts"]);
        assert_eq!(m.matches("src/a/b/c.ts"), Some(true));
        assert_eq!(m.matches("srcx/a.ts"), Some(false));
    }

    #[test]
    fn single_star_stops_at_separator() {
        let m = ScopeMatcher::compile(&["src/*.ts"]);
        assert_eq!(m.matches("src/a.ts"), Some(true));
        assert_eq!(m.matches("src/a/b.ts"), Some(false));
    }

    #[test]
    fn metacharacters_are_literal() {
        let m = ScopeMatcher::compile(&["docs/v1.0/*.md"]);
        assert_eq!(m.matches("docs/v1.0/a.md"), Some(true));
        assert_eq!(m.matches("docs/v1x0/a.md"), Some(false));
        let m = ScopeMatcher::compile(&["lib/(x)/*"]);
        assert_eq!(m.matches("lib/(x)/y.rs"), Some(true));
    }

    #[test]
    fn empty_scope_is_unrestricted() {
        let empty: [&str; 0] = [];
        assert_eq!(matches_scope("anything.ts", &empty), None);
    }

    #[test]
    fn literal_directory_prefix() {
        assert_eq!(matches_scope("lib/x.ts", &["lib"]), Some(true));
        assert_eq!(matches_scope("lib2/x.ts", &["lib"]), Some(false));
        assert_eq!(matches_scope("lib", &["lib"]), Some(true));
        assert_eq!(matches_scope("lib/x.ts", &["lib/"]), Some(true));
    }

    #[test]
    fn entries_and_paths_are_normalized() {
        assert_eq!(matches_scope(".\\src\\app\\main.ts", &["./src/app"]), Some(true));
        assert_eq!(matches_scope("src/app/main.ts", &["  src/app/**  "]), Some(true));
    }

    #[test]
    fn blank_entries_match_nothing() {
        let none: [&str; 0] = [];
        assert_eq!(matches_scope("x.ts", &none), None);
        assert_eq!(matches_scope("x.ts", &["", "   "]), Some(false));
        assert_eq!(matches_scope("x.ts", &["", "src"]), Some(false));
    }

    #[test]
    fn out_of_scope_lists_only_explicit_failures() {
        let m = ScopeMatcher::compile(&["src/app/**"]);
        let out = m.out_of_scope(["src/app/ok.ts", "src/other/file.ts"]);
        assert_eq!(out, vec!["src/other/file.ts".to_string()]);

        let unrestricted = ScopeMatcher::compile::<&str>(&[]);
        assert!(unrestricted.out_of_scope(["x.ts"]).is_empty());
    }

    #[test]
    fn glob_translation_shape() {
        assert_eq!(glob_to_regex("a/**"), "^a/.*$");
        assert_eq!(glob_to_regex("*.rs"), "^[^/]*\\.rs$");
    }
}
