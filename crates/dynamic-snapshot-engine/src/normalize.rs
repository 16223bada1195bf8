//! Content normalization applied to fetched data before it is compared or
//! stored.
//!
//! The pipeline is fixed: ignored lines are removed first, then whitespace
//! sequences are collapsed, then leading and trailing whitespace is stripped
//! from every line. The two whitespace steps can be switched off
//! independently through [`NormalizationConfig`].

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::error::ConfigurationError;

/// Whitespace rules for [`clean_content`]. Both rules are active by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizationConfig {
    pub allow_trailing_spaces: bool,
    pub allow_space_sequences: bool,
}

/// Ordered set of patterns whose matches are removed from the data.
///
/// Patterns are compiled verbatim; a pattern meant to drop whole lines has to
/// match the line terminator itself, e.g. `(?m)^Date: .*\n`.
#[derive(Debug, Clone, Default)]
pub struct IgnoredLines {
    patterns: Vec<Regex>,
}

impl IgnoredLines {
    pub fn new<I, P>(patterns: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                Regex::new(pattern).map_err(|source| ConfigurationError::Pattern {
                    pattern: pattern.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Remove every match of every pattern, in order.
    pub fn remove_from(&self, data: &str) -> String {
        self.patterns
            .iter()
            .fold(data.to_string(), |data, pattern| {
                pattern.replace_all(&data, "").into_owned()
            })
    }
}

/// Run the whole pipeline: ignored lines, then whitespace rules.
///
/// Both stages run a second time, so a pattern that only matches once a line
/// is trimmed (`^Debug:` against `  Debug: ...`) is removed as well. Stored
/// snapshots have been through this pipeline, which keeps them stable when
/// ignored lines are removed again on load.
pub fn normalize(raw: &str, ignored: &IgnoredLines, config: NormalizationConfig) -> String {
    let data = clean_content(&remove_ignored_lines(raw, ignored), config);
    if ignored.is_empty() {
        return data;
    }
    clean_content(&remove_ignored_lines(&data, ignored), config)
}

pub fn remove_ignored_lines(data: &str, ignored: &IgnoredLines) -> String {
    ignored.remove_from(data)
}

/// Apply the whitespace rules of `config` line by line.
///
/// Line terminators are never touched, so the number of lines is preserved.
pub fn clean_content(data: &str, config: NormalizationConfig) -> String {
    let mut data = data.to_string();

    if !config.allow_space_sequences {
        data = space_sequences()
            .replace_all(&data, |caps: &Captures| {
                caps[0].chars().last().map(String::from).unwrap_or_default()
            })
            .into_owned();
    }

    if !config.allow_trailing_spaces {
        data = line_edges().replace_all(&data, "").into_owned();
    }

    data
}

// Whitespace other than `\n`, so runs never span two lines.
fn space_sequences() -> &'static Regex {
    static SPACE_SEQUENCES: OnceLock<Regex> = OnceLock::new();
    SPACE_SEQUENCES
        .get_or_init(|| Regex::new(r"[^\S\n]{2,}").expect("Invalid space sequence regex"))
}

fn line_edges() -> &'static Regex {
    static LINE_EDGES: OnceLock<Regex> = OnceLock::new();
    LINE_EDGES.get_or_init(|| {
        Regex::new(r"(?m)^[^\S\n]+|[^\S\n]+$").expect("Invalid line edge regex")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const SPACED: &str = "   foo   bar   baz        asd    ";

    fn config(allow_space_sequences: bool, allow_trailing_spaces: bool) -> NormalizationConfig {
        NormalizationConfig {
            allow_trailing_spaces,
            allow_space_sequences,
        }
    }

    #[test]
    fn test_default_config_cleans_everything() {
        let config = NormalizationConfig::default();
        assert!(!config.allow_trailing_spaces);
        assert!(!config.allow_space_sequences);
    }

    #[rstest]
    #[case::sequences_only(false, true, " foo bar baz asd ")]
    #[case::trailing_only(true, false, "foo   bar   baz        asd")]
    #[case::both(false, false, "foo bar baz asd")]
    #[case::neither(true, true, SPACED)]
    fn test_clean_content(
        #[case] allow_space_sequences: bool,
        #[case] allow_trailing_spaces: bool,
        #[case] expected: &str,
    ) {
        let cleaned = clean_content(SPACED, config(allow_space_sequences, allow_trailing_spaces));
        assert_eq!(cleaned, expected);
    }

    #[test]
    fn test_clean_content_keeps_the_last_whitespace_of_a_run() {
        let cleaned = clean_content("a \t b\t \tc", config(false, true));
        assert_eq!(cleaned, "a b\tc");
    }

    #[test]
    fn test_clean_content_works_per_line() {
        let input = "  first   line  \n\tsecond\t\tline\n\n   \nlast";
        let cleaned = clean_content(input, NormalizationConfig::default());
        assert_eq!(cleaned, "first line\nsecond\tline\n\n\nlast");
    }

    #[test]
    fn test_clean_content_strips_carriage_returns_at_line_end() {
        let cleaned = clean_content("one \r\ntwo\r\n", NormalizationConfig::default());
        assert_eq!(cleaned, "one\ntwo\n");
    }

    #[test]
    fn test_ignored_lines_removes_all_matches_in_order() {
        let ignored =
            IgnoredLines::new([r"(?m)^Date: .*\n", r"(?m)^Request-Id: \w+\n"]).unwrap();
        let input = "Status: 200\nDate: Mon, 01 Jan\nRequest-Id: abc123\nBody\nDate: Tue\n";

        assert_eq!(ignored.remove_from(input), "Status: 200\nBody\n");
    }

    #[test]
    fn test_ignored_lines_are_not_anchored_implicitly() {
        let ignored = IgnoredLines::new(["took [0-9]+ms"]).unwrap();
        assert_eq!(ignored.remove_from("done, took 15ms."), "done, .");
    }

    #[test]
    fn test_ignored_lines_without_matches_is_noop() {
        let ignored = IgnoredLines::new(["never-there"]).unwrap();
        assert_eq!(remove_ignored_lines("some text", &ignored), "some text");
    }

    #[test]
    fn test_invalid_ignored_pattern_is_configuration_error() {
        let result = IgnoredLines::new(["(unclosed"]);
        match result {
            Err(ConfigurationError::Pattern { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected pattern error, got {other:?}"),
        }
    }

    #[test]
    fn test_ignored_lines_exposes_patterns() {
        let ignored = IgnoredLines::new(["a+", "b+"]).unwrap();
        assert_eq!(ignored.patterns().collect::<Vec<_>>(), vec!["a+", "b+"]);
        assert!(!ignored.is_empty());
        assert!(IgnoredLines::default().is_empty());
    }

    #[test]
    fn test_normalize_removes_ignored_lines_before_whitespace() {
        let ignored = IgnoredLines::new([r"(?m)^\s*generated at .*\n"]).unwrap();
        let input = "  header   row \n   generated at 12:00:01\n  body  \n";

        let normalized = normalize(input, &ignored, NormalizationConfig::default());
        assert_eq!(normalized, "header row\nbody\n");
    }

    #[test]
    fn test_normalize_removes_lines_matching_only_after_trimming() {
        let ignored = IgnoredLines::new([r"(?m)^Debug: .*\n"]).unwrap();
        let input = "  Debug: noise\nbody\n   Debug:   more\n";

        let normalized = normalize(input, &ignored, NormalizationConfig::default());
        assert_eq!(normalized, "body\n");
    }

    #[test]
    fn test_normalize_cleans_whitespace_left_by_late_removal() {
        let ignored = IgnoredLines::new([r"(?m)^took \d+ms"]).unwrap();

        let normalized = normalize("  took 5ms  done", &ignored, NormalizationConfig::default());
        assert_eq!(normalized, "done");
    }

    #[rstest]
    #[case(false, false)]
    #[case(false, true)]
    #[case(true, false)]
    #[case(true, true)]
    fn test_normalize_is_idempotent(
        #[case] allow_space_sequences: bool,
        #[case] allow_trailing_spaces: bool,
    ) {
        let ignored = IgnoredLines::new([r"(?m)^#.*\n"]).unwrap();
        let config = config(allow_space_sequences, allow_trailing_spaces);
        let inputs = [
            SPACED,
            "  a \t\n\n \t b  \r\n#comment\n  c",
            "\t\t\n \n",
            "  #comment\nx",
            "",
        ];

        for input in inputs {
            let once = normalize(input, &ignored, config);
            let twice = normalize(&once, &ignored, config);
            assert_eq!(twice, once, "not idempotent for {input:?}");
        }
    }
}
