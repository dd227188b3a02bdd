use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub wpm: f64,
    pub accuracy: f64,
}

/// Percentage of `original` reproduced at the same position in `typed`.
///
/// Strictly positional: an inserted or dropped character shifts every later
/// comparison. An empty `original` scores 100.
pub fn accuracy(original: &str, typed: &str) -> f64 {
    let total = original.chars().count();
    if total == 0 {
        return 100.0;
    }
    let matches = original
        .chars()
        .zip(typed.chars())
        .filter(|(expected, got)| expected == got)
        .count();
    (matches as f64 / total as f64) * 100.0
}

/// Whitespace-delimited words in `typed` per minute. Not clamped.
pub fn words_per_minute(typed: &str, elapsed_seconds: f64) -> f64 {
    if elapsed_seconds > 0.0 {
        let words = typed.split_whitespace().count();
        (words as f64 / elapsed_seconds) * 60.0
    } else {
        0.0
    }
}

pub fn compute_score(original: &str, typed: &str, elapsed_seconds: f64) -> Score {
    Score {
        wpm: words_per_minute(typed, elapsed_seconds),
        accuracy: accuracy(original, typed),
    }
}
