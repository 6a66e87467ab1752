//! Ordered filename cleanup rules.
//!
//! Each [`Rule`] is a regex and its replacement. Rules run in table order and
//! each one is re-applied until the text stops changing, so adjacent tokens
//! that share a separator (`.DD.5.1.`) are all removed.

use std::sync::LazyLock;

use regex::Regex;

/// Returned when nothing is left after cleanup.
pub const UNKNOWN_NAME: &str = "unknown_file";

/// Upper bound on re-applications of a single rule.
const MAX_PASSES: usize = 8;

/// One cleanup step.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: &'static str,
    pub pattern: Regex,
    pub replacement: &'static str,
}

impl Rule {
    pub fn new(
        name: &'static str,
        pattern: &str,
        replacement: &'static str,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            name,
            pattern: Regex::new(pattern)?,
            replacement,
        })
    }

    /// Apply until fixpoint.
    pub fn apply(&self, input: &str) -> String {
        let mut current = input.to_string();
        for _ in 0..MAX_PASSES {
            let next = self.pattern.replace_all(&current, self.replacement);
            if next == current {
                break;
            }
            current = next.into_owned();
        }
        current
    }
}

const DEFAULT_TABLE: &[(&str, &str, &str)] = &[
    // @-credits glued between underscores: "1080p_@Group_x264"
    ("credit-underscored", r"_@[A-Za-z0-9]+_", " "),
    ("credit-suffixed", r"@[A-Za-z0-9]+_", " "),
    // "[@Group]", " @Group ", "@Group" up to the next dot
    ("credit", r"[\[\]\s@]*@[^.\s\[\]]+[\]\[\s@]*", " "),
    ("bracketed", r"\[[^\[\]]*\]", " "),
    ("stray-bracket", r"[\[\]]", " "),
    (
        "release-noise",
        r"(?i)([^\w])(?:org|amzn|ddp|dd|nf|aac|tvdl|5\.1|2\.1|2\.0|7\.0|7\.1|5\.0|~|\w+kbps)([^\w])",
        "${1} ${2}",
    ),
    ("dot-run", r"\.(?:\s*\.)+", "."),
    ("space-before-dot", r"\s+\.", "."),
    ("whitespace", r"\s+", " "),
    ("edge-separators", r"^[\s._-]+|[\s._-]+$", ""),
];

static DEFAULT_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    DEFAULT_TABLE
        .iter()
        .map(|&(name, pattern, replacement)| {
            Rule::new(name, pattern, replacement).expect("built-in cleanup pattern is valid")
        })
        .collect()
});

/// The built-in rule table, in application order.
pub fn default_rules() -> &'static [Rule] {
    &DEFAULT_RULES
}

/// Applies a rule table to filenames.
#[derive(Debug, Clone)]
pub struct Normalizer {
    rules: Vec<Rule>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(default_rules().to_vec())
    }
}

impl Normalizer {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn normalize(&self, raw_name: &str) -> String {
        apply_all(&self.rules, raw_name)
    }
}

/// Clean a filename with the built-in rule table.
pub fn normalize(raw_name: &str) -> String {
    apply_all(default_rules(), raw_name)
}

fn apply_all(rules: &[Rule], raw_name: &str) -> String {
    let cleaned = rules
        .iter()
        .fold(raw_name.to_string(), |text, rule| rule.apply(&text));
    match cleaned.trim() {
        "" => UNKNOWN_NAME.to_string(),
        trimmed => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_underscored_credit() {
        let out = normalize("Movie.Name.2023.1080p_@GroupTag_x264");
        assert!(!out.contains('@'));
        assert!(!out.contains('[') && !out.contains(']'));
        assert_eq!(out, "Movie.Name.2023.1080p x264");
    }

    #[test]
    fn strips_bracketed_credit_before_extension() {
        assert_eq!(normalize("Movie 2020 [@Uploads].mkv"), "Movie 2020.mkv");
    }

    #[test]
    fn strips_bracketed_groups() {
        assert_eq!(
            normalize("[SubsPlease] Jujutsu Kaisen - 24 (1080p) [ABCD1234].mkv"),
            "Jujutsu Kaisen - 24 (1080p).mkv"
        );
    }

    #[test]
    fn strips_adjacent_noise_tokens() {
        assert_eq!(
            normalize("Movie.Name.2023.DD.5.1.AAC.mkv"),
            "Movie.Name.2023.mkv"
        );
    }

    #[test]
    fn noise_is_case_insensitive() {
        assert_eq!(normalize("Show.S01E01.amzn.Aac.mkv"), "Show.S01E01.mkv");
        assert_eq!(normalize("Film 320kbps ~ AMZN.mkv"), "Film.mkv");
    }

    #[test]
    fn keeps_noise_lookalikes_inside_words() {
        assert_eq!(normalize("Oddball.2015.mkv"), "Oddball.2015.mkv");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize("  A   Quiet    Place  "), "A Quiet Place");
    }

    #[test]
    fn empty_result_uses_sentinel() {
        assert_eq!(normalize(""), UNKNOWN_NAME);
        assert_eq!(normalize("[@Uploads]"), UNKNOWN_NAME);
        assert_eq!(normalize("   "), UNKNOWN_NAME);
    }

    #[test]
    fn normalize_is_deterministic() {
        let name = "Some.Show.S02E03.NF.DDP.2.0_@Chan_.mkv";
        assert_eq!(normalize(name), normalize(name));
    }

    #[test]
    fn rule_table_is_ordered_and_named() {
        let names: Vec<_> = default_rules().iter().map(|r| r.name).collect();
        assert_eq!(names.first(), Some(&"credit-underscored"));
        assert_eq!(names.last(), Some(&"edge-separators"));
    }

    #[test]
    fn custom_table() {
        let normalizer = Normalizer::new(vec![Rule::new("x264", r"(?i)x264", "").unwrap()]);
        assert_eq!(normalizer.normalize("Film x264"), "Film");
        assert_eq!(normalizer.rules().len(), 1);
    }

    #[test]
    fn default_normalizer_matches_free_function() {
        let n = Normalizer::default();
        let name = "Movie.Name.2023.1080p_@GroupTag_x264";
        assert_eq!(n.normalize(name), normalize(name));
    }
}
