use regex::{Regex, RegexBuilder};

/// `true` for a criterion that should match everything (blank or `*`).
pub fn is_wildcard(pattern: &str) -> bool {
    let p = pattern.trim();
    p.is_empty() || p == "*"
}

/// Case-insensitive "find anywhere" matcher.
///
/// Compiled from user text as a regex; text that is not a valid regex is
/// escaped and matched literally instead.
#[derive(Clone, Debug)]
pub struct TextMatcher {
    source: String,
    regex: Option<Regex>,
    literal_fallback: bool,
}

impl TextMatcher {
    pub fn new(pattern: &str) -> Self {
        match build(pattern) {
            Some(regex) => Self {
                source: pattern.to_string(),
                regex: Some(regex),
                literal_fallback: false,
            },
            // An escaped pattern only fails on pathological size; match nothing then.
            None => Self {
                source: pattern.to_string(),
                regex: build(&regex::escape(pattern)),
                literal_fallback: true,
            },
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|r| r.is_match(text))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the pattern failed to compile and is being matched literally.
    pub fn is_literal_fallback(&self) -> bool {
        self.literal_fallback
    }
}

fn build(pattern: &str) -> Option<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regex_matches_case_insensitively() {
        let m = TextMatcher::new("^ingot(Iron|Copper)$");
        assert!(m.is_match("ingotiron"));
        assert!(m.is_match("INGOTCOPPER"));
        assert!(!m.is_match("ingotTin"));
        assert!(!m.is_literal_fallback());
    }

    #[test]
    fn invalid_regex_falls_back_to_literal_substring() {
        let m = TextMatcher::new("dust(Tiny");
        assert!(m.is_literal_fallback());
        assert!(m.is_match("xxDUST(TINYxx"));
        assert!(!m.is_match("dustTiny"));
    }

    #[test]
    fn wildcard_detection() {
        assert!(is_wildcard(""));
        assert!(is_wildcard("  * "));
        assert!(!is_wildcard("dust*"));
    }
}
