use std::sync::LazyLock;

use regex::Regex;

pub const REDACTED: &str = "[redacted]";

/// Longest free-text field persisted, in characters.
pub const MAX_FIELD_CHARS: usize = 500;

const ELLIPSIS: char = '…';

/// Compiled secret patterns, applied in order.
static SECRET_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        // Assignment style: token=..., password: ..., apiKey = "..."
        (
            Regex::new(r#"(?i)(key|secret|token|password)(\s*[:=]\s*)("[^"]*"|'[^']*'|[^\s,;&]+)"#)
                .unwrap(),
            "${1}${2}[redacted]",
        ),
        // Standalone opaque tokens of 32+ characters
        (
            Regex::new(r"(^|[^A-Za-z0-9_-])[A-Za-z0-9_-]{32,}").unwrap(),
            "${1}[redacted]",
        ),
    ]
});

/// Redact likely secrets from a string.
pub fn redact_secrets(input: &str) -> String {
    let mut output = input.to_string();
    for (pat, replacement) in SECRET_PATTERNS.iter() {
        output = pat.replace_all(&output, *replacement).into_owned();
    }
    output
}

/// Prepare free text for the append-only log: collapse whitespace, redact,
/// then truncate to [`MAX_FIELD_CHARS`].
pub fn sanitize(input: &str) -> String {
    let collapsed = input.split_whitespace().collect::<Vec<_>>().join(" ");
    let redacted = redact_secrets(&collapsed);
    if redacted.chars().count() <= MAX_FIELD_CHARS {
        return redacted;
    }
    let mut out: String = redacted.chars().take(MAX_FIELD_CHARS).collect();
    out.push(ELLIPSIS);
    out
}

pub fn sanitize_all(items: &[String]) -> Vec<String> {
    items.iter().map(|s| sanitize(s)).collect()
}

pub fn sanitize_opt(input: Option<&str>) -> Option<String> {
    input.map(sanitize).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_token_assignment() {
        let out = redact_secrets("token=deadbeefdeadbeefdeadbeefdeadbeef");
        assert!(out.contains("token=[redacted]"), "{out}");
        assert!(!out.contains("deadbeef"));
    }

    #[test]
    fn redact_password_with_colon_and_quotes() {
        let out = redact_secrets(r#"set password: "hunter2 2" then apiKey = abc"#);
        assert_eq!(out, "set password: [redacted] then apiKey = [redacted]");
    }

    #[test]
    fn redact_standalone_long_token() {
        let token = "0123456789abcdef0123456789abcdef01234567";
        assert_eq!(token.len(), 40);
        let out = redact_secrets(&format!("pushed with {token} today"));
        assert_eq!(out, "pushed with [redacted] today");
    }

    #[test]
    fn short_tokens_survive() {
        let input = "refactor parser for clarity, commit 1a2b3c4d";
        assert_eq!(redact_secrets(input), input);
    }

    #[test]
    fn sanitize_collapses_whitespace() {
        assert_eq!(sanitize("  split\n\tthe   renderer  "), "split the renderer");
    }

    #[test]
    fn sanitize_truncates_with_ellipsis() {
        let long = "word ".repeat(200);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), MAX_FIELD_CHARS + 1);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn sanitize_opt_drops_blank() {
        assert_eq!(sanitize_opt(Some("   ")), None);
        assert_eq!(sanitize_opt(Some(" a ")), Some("a".to_string()));
        assert_eq!(sanitize_opt(None), None);
    }
}
