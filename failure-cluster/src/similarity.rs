//! Similarity scoring between error signatures
//!
//! Signatures of different categories are never the same root cause and
//! score exactly 0.0. Within a category the score is the token-sequence
//! overlap of the normalized messages:
//!
//! ```text
//! ratio = 2 * LCS(tokens_a, tokens_b) / (len(tokens_a) + len(tokens_b))
//! ```
//!
//! The ratio is reflexive, symmetric, lies in `[0, 1]` and is total: two
//! empty messages score 1.0.

use crate::signature::ErrorSignature;

/// Score two signatures in `[0.0, 1.0]`
pub fn similarity(a: &ErrorSignature, b: &ErrorSignature) -> f64 {
    if a.error_category != b.error_category {
        return 0.0;
    }
    if a.fingerprint == b.fingerprint {
        return 1.0;
    }
    message_similarity(&a.normalized_message, &b.normalized_message)
}

/// Token-sequence overlap ratio of two normalized messages
pub fn message_similarity(a: &str, b: &str) -> f64 {
    let tokens_a: Vec<&str> = a.split_whitespace().collect();
    let tokens_b: Vec<&str> = b.split_whitespace().collect();

    let total = tokens_a.len() + tokens_b.len();
    if total == 0 {
        return 1.0;
    }

    let common = lcs_len(&tokens_a, &tokens_b);
    (2 * common) as f64 / total as f64
}

/// Longest common subsequence length, two-row dynamic programming
fn lcs_len(a: &[&str], b: &[&str]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    // keep the shorter sequence on the row axis
    let (outer, inner) = if a.len() >= b.len() { (a, b) } else { (b, a) };

    let mut prev = vec![0usize; inner.len() + 1];
    let mut curr = vec![0usize; inner.len() + 1];

    for x in outer {
        for (j, y) in inner.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[inner.len()]
}
