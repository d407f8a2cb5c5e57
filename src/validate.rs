// Text length validation, run after extraction and before classification.
//
// Lengths are counted in characters (Unicode scalar values) of the trimmed
// text, so a Cyrillic or CJK document isn't penalised for its UTF-8 width.
// The upper bound also caps how much work a single request can hand the
// classifier.

use thiserror::Error;

/// Inclusive character-count bounds for accepted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min_chars: usize,
    pub max_chars: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            min_chars: 10,
            max_chars: 10_000,
        }
    }
}

/// Why a text was refused. The Display strings are shown to API clients.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Text is empty or the file contains no readable text")]
    Empty,
    #[error("Text is too short: at least {min} characters required, got {actual}")]
    TooShort { min: usize, actual: usize },
    #[error("Text is too long: at most {max} characters allowed, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Check `text` against `limits`. Both boundaries are accepted.
pub fn validate(text: &str, limits: &Limits) -> Result<(), Rejection> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(Rejection::Empty);
    }

    let actual = trimmed.chars().count();
    if actual < limits.min_chars {
        return Err(Rejection::TooShort {
            min: limits.min_chars,
            actual,
        });
    }
    if actual > limits.max_chars {
        return Err(Rejection::TooLong {
            max: limits.max_chars,
            actual,
        });
    }
    Ok(())
}
