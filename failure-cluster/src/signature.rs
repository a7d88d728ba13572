//! Signature extraction
//!
//! Turns one failure record into a structured, comparable signature:
//! error category, normalized message, optional source location and a
//! content fingerprint. Extraction never fails; unstructured input degrades
//! to [`ErrorCategory::Unknown`], an empty message or an unset location.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::normalize::Normalizer;
use crate::types::FailureRecord;

/// Separates category from message in the fingerprint input
const FINGERPRINT_SEPARATOR: char = '\u{1f}';

static CATEGORY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[A-Z][A-Za-z0-9_]*)?(?:Error|Exception|Warning)$")
        .expect("Invalid category regex")
});

static PATH_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?P<path>(?:\b[A-Za-z]:[/\\])?[^\s:'"()\[\]]*[/\\.][^\s:'"()\[\]]*):(?P<line>\d+)"#,
    )
    .expect("Invalid path:line regex")
});

static PY_FRAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"File "(?P<path>[^"]+)", line (?P<line>\d+)"#).expect("Invalid frame regex")
});

/// Failure class parsed from the first token of a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ErrorCategory {
    /// A well-formed category such as `AssertionError`
    Named(String),
    /// Sentinel for messages without a recognizable category
    Unknown,
}

impl ErrorCategory {
    pub const UNKNOWN: &'static str = "Unknown";

    /// Parse a category candidate, falling back to `Unknown`.
    ///
    /// A trailing `:` is dropped and a module-qualified name keeps only its
    /// last segment (`requests.exceptions.ConnectionError`).
    pub fn parse(candidate: &str) -> Self {
        let trimmed = candidate.trim_end_matches(':');
        let name = trimmed.rsplit('.').next().unwrap_or(trimmed);

        if CATEGORY_RE.is_match(name) {
            ErrorCategory::Named(name.to_string())
        } else {
            ErrorCategory::Unknown
        }
    }

    /// Parse the category from the first token of a message's first line
    pub fn from_message(message: &str) -> Self {
        message
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().next())
            .map(Self::parse)
            .unwrap_or(ErrorCategory::Unknown)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ErrorCategory::Named(name) => name,
            ErrorCategory::Unknown => Self::UNKNOWN,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ErrorCategory::Unknown)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<ErrorCategory> for String {
    fn from(category: ErrorCategory) -> Self {
        category.as_str().to_string()
    }
}

impl From<String> for ErrorCategory {
    fn from(value: String) -> Self {
        ErrorCategory::parse(&value)
    }
}

/// A (path, line) pair parsed from a stack trace. Display only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub path: String,
    pub line: u32,
}

impl SourceLocation {
    /// Find the last `path:line` (or Python `File "..", line N`) in a trace
    pub fn from_stack_trace(trace: &str) -> Option<Self> {
        trace.lines().filter_map(Self::from_line).last()
    }

    fn from_line(line: &str) -> Option<Self> {
        PY_FRAME_RE
            .captures_iter(line)
            .chain(PATH_LINE_RE.captures_iter(line))
            .filter_map(|caps| {
                let path = caps.name("path")?.as_str();
                let line = caps.name("line")?.as_str().parse::<u32>().ok()?;
                // 10.0.0.1:8080 is an address, not a file
                let looks_like_path = path
                    .chars()
                    .any(|c| c.is_alphabetic() || c == '/' || c == '\\');
                looks_like_path.then(|| SourceLocation {
                    path: path.to_string(),
                    line,
                })
            })
            .last()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.path, self.line)
    }
}

/// Structured, comparable representation of one failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSignature {
    pub error_category: ErrorCategory,
    pub normalized_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_location: Option<SourceLocation>,
    pub fingerprint: String,
}

impl ErrorSignature {
    /// Build a signature, deriving the fingerprint from category and message
    pub fn new(
        error_category: ErrorCategory,
        normalized_message: String,
        source_location: Option<SourceLocation>,
    ) -> Self {
        let fingerprint = fingerprint(&error_category, &normalized_message);
        Self {
            error_category,
            normalized_message,
            source_location,
            fingerprint,
        }
    }

    /// Extract the signature of a failure record
    pub fn extract(record: &FailureRecord, normalizer: &Normalizer) -> Self {
        let message = record.message();
        let error_category = ErrorCategory::from_message(message);
        let normalized_message = normalizer.normalize(message);
        let source_location = record
            .stack_trace
            .as_deref()
            .and_then(SourceLocation::from_stack_trace);

        Self::new(error_category, normalized_message, source_location)
    }
}

/// SHA-256 over category and normalized message, hex encoded.
///
/// Source location is deliberately excluded.
pub fn fingerprint(category: &ErrorCategory, normalized_message: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(category.as_str().as_bytes());
    hasher.update(FINGERPRINT_SEPARATOR.to_string().as_bytes());
    hasher.update(normalized_message.as_bytes());
    format!("{:x}", hasher.finalize())
}
