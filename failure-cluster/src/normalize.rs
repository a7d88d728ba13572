//! Message normalizer
//!
//! Rewrites a raw failure message into a canonical, comparison-only form by
//! masking variable substrings with fixed placeholders. Rules run in a fixed
//! order: IPv4 addresses, hex blobs, UUIDs, absolute paths, timestamps,
//! bare numbers, then the configurable device/host identifier patterns, and
//! finally whitespace collapsing.
//!
//! Normalized text is never shown to users; it only feeds fingerprints and
//! similarity scoring.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, ClusterResult};

pub const IP_PLACEHOLDER: &str = "<IP>";
pub const HEX_PLACEHOLDER: &str = "<HEX>";
pub const UUID_PLACEHOLDER: &str = "<UUID>";
pub const PATH_PLACEHOLDER: &str = "<PATH>";
pub const TIMESTAMP_PLACEHOLDER: &str = "<TS>";
pub const NUM_PLACEHOLDER: &str = "<NUM>";
pub const ID_PLACEHOLDER: &str = "<ID>";

/// Upper bound on rule passes per message
const MAX_PASSES: usize = 16;

static IPV4_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").expect("Invalid IPv4 regex")
});

static HEX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"0[xX][0-9a-fA-F]{4,}|[0-9a-fA-F]{6,}").expect("Invalid hex regex")
});

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}\b",
    )
    .expect("Invalid UUID regex")
});

// The leading group keeps whatever delimiter precedes the path so only the
// path itself is masked. Relative paths (`a/b`) never start a token this way.
static PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[\s"'(\[=,:])(?:~|[A-Za-z]:)?[/\\][\w.\-~<>]+(?:[/\\][\w.\-~<>]*)*"#)
        .expect("Invalid path regex")
});

// ISO dates with optional time and zone, and bare clock times with seconds
static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b\d{4}-\d{2}-\d{2}(?:[T ]\d{2}:\d{2}(?::\d{2}(?:[.,]\d+)?)?)?(?:Z|[+-]\d{2}:?\d{2})?\b|\b\d{1,2}:\d{2}:\d{2}(?:[.,]\d+)?\b",
    )
    .expect("Invalid timestamp regex")
});

static NUM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Invalid number regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// Built-in device/host identifier patterns.
///
/// These run after the number rule, which leaves digits glued to a word
/// (`dev123`, `dut-3`, `str-msn2700-01`) untouched for them.
pub fn default_id_patterns() -> Vec<String> {
    vec![
        // Hyphenated hostnames ending in a number: str-msn2700-01, rack-12-3.
        // Runs first so a whole chain is masked at once.
        r"\b[A-Za-z][A-Za-z0-9]*(?:-[A-Za-z0-9]+)*-\d+\b".to_string(),
        // Lab equipment names: dut-3, node07, leaf_12, vm-4a
        r"(?i)\b(?:dut|dev|device|host|node|switch|leaf|spine|tor|rack|vm|server)[-_]?\d+[A-Za-z0-9_]*\b"
            .to_string(),
    ]
}

static DEFAULT_ID_REGEXES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    default_id_patterns()
        .iter()
        .map(|p| Regex::new(p).expect("Invalid built-in identifier regex"))
        .collect()
});

/// Identifier-pattern configuration (the `[normalizer]` config section)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Replaces the built-in identifier patterns when set
    #[serde(default)]
    pub id_patterns: Option<Vec<String>>,

    /// Appended after the active identifier patterns
    #[serde(default)]
    pub extra_id_patterns: Vec<String>,
}

/// Canonicalizes failure messages for comparison
#[derive(Debug, Clone)]
pub struct Normalizer {
    id_patterns: Vec<Regex>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            id_patterns: DEFAULT_ID_REGEXES.clone(),
        }
    }
}

impl Normalizer {
    /// Create a normalizer with an explicit identifier pattern list
    pub fn new(id_patterns: Vec<Regex>) -> Self {
        Self { id_patterns }
    }

    /// Build a normalizer from config, compiling every identifier pattern
    pub fn from_config(config: &NormalizerConfig) -> ClusterResult<Self> {
        let base: Vec<String> = match &config.id_patterns {
            Some(patterns) => patterns.clone(),
            None => default_id_patterns(),
        };

        let id_patterns = base
            .iter()
            .chain(config.extra_id_patterns.iter())
            .filter(|p| {
                // an empty regex matches between every character
                let blank = p.trim().is_empty();
                if blank {
                    tracing::warn!("Skipping blank identifier pattern");
                }
                !blank
            })
            .map(|p| {
                Regex::new(p).map_err(|e| ClusterError::InvalidPattern {
                    pattern: p.clone(),
                    source: e,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = id_patterns.len(), "Compiled identifier patterns");

        Ok(Self::new(id_patterns))
    }

    /// The active identifier patterns, in application order
    pub fn id_patterns(&self) -> &[Regex] {
        &self.id_patterns
    }

    /// Normalize a raw message. Empty input yields an empty string.
    ///
    /// The rule sequence is repeated until the text is stable, since an
    /// identifier mask can free a neighbouring number or hex blob. Every
    /// built-in rule removes digits or path separators, so this converges;
    /// `MAX_PASSES` only bounds pathological custom patterns.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.is_empty() {
            return String::new();
        }

        let mut current = self.apply_rules(raw);
        for _ in 1..MAX_PASSES {
            let next = self.apply_rules(&current);
            if next == current {
                break;
            }
            current = next;
        }
        current
    }

    /// One pass of every rule, in order
    fn apply_rules(&self, raw: &str) -> String {
        let text = IPV4_RE.replace_all(raw, IP_PLACEHOLDER);
        let text =
            replace_standalone(&text, &HEX_RE, HEX_PLACEHOLDER, Hyphen::AnyWord, is_hex_blob);
        let text = UUID_RE.replace_all(&text, UUID_PLACEHOLDER);
        let text = PATH_RE.replace_all(&text, format!("${{1}}{}", PATH_PLACEHOLDER).as_str());
        let text = TIMESTAMP_RE.replace_all(&text, TIMESTAMP_PLACEHOLDER);
        let mut text =
            replace_standalone(&text, &NUM_RE, NUM_PLACEHOLDER, Hyphen::LetterWord, |_| true);

        for pattern in &self.id_patterns {
            text = pattern.replace_all(&text, ID_PLACEHOLDER).into_owned();
        }

        WHITESPACE_RE.replace_all(&text, " ").trim().to_string()
    }
}

/// Pure-letter runs shorter than this are treated as words (`facade`)
const MIN_LETTER_HEX_LEN: usize = 8;

/// A hex blob is `0x`-prefixed, mixes digits with hex letters, or is a long
/// run of hex letters (`deadbeefcafe`). Pure digits belong to the number rule.
fn is_hex_blob(candidate: &str) -> bool {
    if candidate.starts_with("0x") || candidate.starts_with("0X") {
        return true;
    }
    let has_digit = candidate.bytes().any(|b| b.is_ascii_digit());
    let has_letter = candidate.bytes().any(|b| b.is_ascii_alphabetic());
    match (has_digit, has_letter) {
        (true, true) => true,
        (false, true) => candidate.len() >= MIN_LETTER_HEX_LEN,
        _ => false,
    }
}

/// When a hyphen-joined neighbour glues a match to its word
#[derive(Debug, Clone, Copy)]
enum Hyphen {
    /// Any word glues: keeps `550e8400-e29b` whole for the UUID rule
    AnyWord,
    /// Only a token containing a letter glues: `dut-3` stays for the
    /// identifier rule while `3-7` splits into two numbers
    LetterWord,
}

/// Replace matches that stand on their own, i.e. are not glued to a word.
fn replace_standalone(
    text: &str,
    re: &Regex,
    placeholder: &str,
    hyphen: Hyphen,
    accept: impl Fn(&str) -> bool,
) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;

    for m in re.find_iter(text) {
        if !is_standalone(text, m.start(), m.end(), hyphen) || !accept(m.as_str()) {
            continue;
        }
        out.push_str(&text[last..m.start()]);
        out.push_str(placeholder);
        last = m.end();
    }

    out.push_str(&text[last..]);
    out
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_standalone(text: &str, start: usize, end: usize, hyphen: Hyphen) -> bool {
    let head = &text[..start];
    let tail = &text[end..];

    let mut before = head.chars().rev();
    let hyphen_before = match before.next() {
        Some(c) if is_word_char(c) => return false,
        Some('-') => before.next().is_some_and(is_word_char),
        _ => false,
    };

    let mut after = tail.chars();
    let hyphen_after = match after.next() {
        Some(c) if is_word_char(c) => return false,
        Some('-') => after.next().is_some_and(is_word_char),
        _ => false,
    };

    if !hyphen_before && !hyphen_after {
        return true;
    }
    match hyphen {
        Hyphen::AnyWord => false,
        Hyphen::LetterWord => !hyphenated_token_has_letter(head, tail),
    }
}

/// Whether the hyphen-joined token around a match contains a letter
fn hyphenated_token_has_letter(head: &str, tail: &str) -> bool {
    let in_token = |c: &char| is_word_char(*c) || *c == '-';
    head.chars()
        .rev()
        .take_while(in_token)
        .chain(tail.chars().take_while(in_token))
        .any(char::is_alphabetic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        Normalizer::default().normalize(raw)
    }

    #[test]
    fn test_masks_ipv4() {
        assert_eq!(
            norm("AssertionError: IP 10.0.0.1 unreachable"),
            "AssertionError: IP <IP> unreachable"
        );
    }

    #[test]
    fn test_masks_hex_blobs() {
        assert_eq!(norm("bad address 0x7ffd1234"), "bad address <HEX>");
        assert_eq!(norm("commit a3f5c9e broke it"), "commit <HEX> broke it");
        // plain words and short hex stay
        assert_eq!(norm("facade decade beef"), "facade decade beef");
    }

    #[test]
    fn test_masks_letter_only_and_short_prefixed_hex() {
        assert_eq!(
            norm("KeyError: hash deadbeefcafe missing"),
            "KeyError: hash <HEX> missing"
        );
        assert_eq!(norm("pid 0x1234 died"), "pid <HEX> died");
        assert_eq!(
            norm("lease deadbeef-dead-beef-dead-beefdeadbeef gone"),
            "lease <UUID> gone"
        );
    }

    #[test]
    fn test_masks_timestamps() {
        assert_eq!(
            norm("TimeoutError: run at 2024-01-01 12:30:45 failed"),
            "TimeoutError: run at <TS> failed"
        );
        assert_eq!(
            norm("TimeoutError: stalled since 2024-01-01T12:30:45Z (retry 2)"),
            "TimeoutError: stalled since <TS> (retry <NUM>)"
        );
        assert_eq!(norm("log rotated 2024-02-17"), "log rotated <TS>");
        assert_eq!(norm("took until 09:15:00.250"), "took until <TS>");
    }

    #[test]
    fn test_numeric_ranges_split_on_hyphen() {
        assert_eq!(norm("expected range 3-7"), "expected range <NUM>-<NUM>");
        assert_eq!(norm("built 2024-1-5"), "built <NUM>-<NUM>-<NUM>");
        // a letter anywhere in the hyphenated token keeps it for identifiers
        assert_eq!(norm("rack-12-3 offline"), "<ID> offline");
    }

    #[test]
    fn test_masks_uuid() {
        assert_eq!(
            norm("session 550e8400-e29b-41d4-a716-446655440000 expired"),
            "session <UUID> expired"
        );
    }

    #[test]
    fn test_masks_paths() {
        assert_eq!(
            norm("cannot open /var/log/syslog.1 for reading"),
            "cannot open <PATH> for reading"
        );
        assert_eq!(norm("missing file='/tmp/x/y.json'"), "missing file='<PATH>'");
        assert_eq!(norm(r"see C:\logs\run.txt"), "see <PATH>");
        // relative paths are not touched
        assert_eq!(norm("see logs/run.txt"), "see logs/run.txt");
    }

    #[test]
    fn test_masks_bare_numbers() {
        assert_eq!(norm("expected 3 got 4.5"), "expected <NUM> got <NUM>");
        assert_eq!(norm("port 8080 closed"), "port <NUM> closed");
        assert_eq!(norm("at <IP>:22"), "at <IP>:<NUM>");
    }

    #[test]
    fn test_masks_device_identifiers() {
        assert_eq!(norm("dut-3 did not reboot"), "<ID> did not reboot");
        assert_eq!(norm("node07 lost link"), "<ID> lost link");
        assert_eq!(norm("str-msn2700-01 timed out"), "<ID> timed out");
    }

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(norm("  a \t\n b   c  "), "a b c");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(norm(""), "");
        assert_eq!(norm("   \n "), "");
    }

    #[test]
    fn test_idempotent_on_mixed_message() {
        let n = Normalizer::default();
        let once = n.normalize(
            "TimeoutError: dut-7 (10.1.2.3) at /opt/run/a.py:12 id=deadbeef01 took 3.5 s",
        );
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn test_identifier_mask_frees_glued_hex() {
        // the hex blob is glued to dev1 until the identifier rule masks it
        let n = Normalizer::default();
        let once = n.normalize("dev1-a1b2c3 unreachable");
        assert_eq!(once, "<ID>-<HEX> unreachable");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn test_explicit_pattern_list() {
        let n = Normalizer::new(vec![Regex::new(r"\bport\d+\b").unwrap()]);
        assert_eq!(n.id_patterns().len(), 1);
        assert_eq!(n.normalize("port12 flapped on dut-3"), "<ID> flapped on dut-3");
    }

    #[test]
    fn test_custom_id_patterns_replace_defaults() {
        let config = NormalizerConfig {
            id_patterns: Some(vec![r"\bbox[A-Z]+\b".to_string()]),
            extra_id_patterns: vec![],
        };
        let n = Normalizer::from_config(&config).unwrap();
        assert_eq!(n.id_patterns().len(), 1);
        assert_eq!(n.normalize("boxQA failed on dut-3"), "<ID> failed on dut-3");
    }

    #[test]
    fn test_extra_id_patterns_append() {
        let config = NormalizerConfig {
            id_patterns: None,
            extra_id_patterns: vec![r"\bchassis[A-Z]\b".to_string()],
        };
        let n = Normalizer::from_config(&config).unwrap();
        assert_eq!(n.id_patterns().len(), default_id_patterns().len() + 1);
        assert_eq!(n.normalize("chassisB and dut-1"), "<ID> and <ID>");
    }

    #[test]
    fn test_blank_patterns_skipped() {
        let config = NormalizerConfig {
            id_patterns: Some(vec!["".to_string(), r"\bboxA\b".to_string()]),
            extra_id_patterns: vec!["  ".to_string()],
        };
        let n = Normalizer::from_config(&config).unwrap();
        assert_eq!(n.id_patterns().len(), 1);
        assert_eq!(n.normalize("boxA down"), "<ID> down");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = NormalizerConfig {
            id_patterns: None,
            extra_id_patterns: vec!["(unclosed".to_string()],
        };
        let err = Normalizer::from_config(&config).unwrap_err();
        assert!(matches!(err, ClusterError::InvalidPattern { .. }));
    }
}
