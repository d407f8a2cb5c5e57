// Trained artifact: a TF-IDF vectorizer and a logistic regression model.
//
// Both are plain JSON exported from the training run (vocabulary + idf for
// the vectorizer, classes + coefficients + intercepts for the model). The
// serving path only ever reads them. The three capabilities the rest of the
// crate relies on are `TfidfVectorizer::transform`, `LogisticModel::predict_proba`
// and `LogisticModel::classes`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use unicode_normalization::char::canonical_combining_class;
use unicode_normalization::UnicodeNormalization;

pub const VECTORIZER_FILE: &str = "text_vectorizer.json";
pub const MODEL_FILE: &str = "text_model.json";

/// Sparse feature vector: (feature index, value) pairs sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

fn default_ngram_range() -> (usize, usize) {
    (1, 1)
}

fn default_true() -> bool {
    true
}

/// Accent folding applied after lowercasing and before tokenizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StripAccents {
    /// NFKD, then drop combining marks (й → и, ї → і, é → e)
    Unicode,
    /// NFKD, then drop everything outside ASCII
    Ascii,
}

impl StripAccents {
    pub fn apply(self, text: &str) -> String {
        if text.is_ascii() {
            return text.to_string();
        }
        match self {
            Self::Unicode => text
                .nfkd()
                .filter(|&c| canonical_combining_class(c) == 0)
                .collect(),
            Self::Ascii => text.nfkd().filter(char::is_ascii).collect(),
        }
    }
}

/// TF-IDF text vectorizer.
///
/// Tokens are runs of two or more alphanumeric/underscore characters; n-grams
/// are space-joined tokens. Term counts are weighted by idf and the row is L2
/// normalised.
///
/// Unknown fields are rejected: an option the trainer used but this struct
/// doesn't implement would otherwise silently change which features match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TfidfVectorizer {
    /// Term (or space-joined n-gram) to feature index
    pub vocabulary: HashMap<String, usize>,
    /// Inverse document frequency per feature index
    pub idf: Vec<f64>,
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default = "default_true")]
    pub lowercase: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_accents: Option<StripAccents>,
    /// Replace tf with 1 + ln(tf)
    #[serde(default)]
    pub sublinear_tf: bool,
}

impl TfidfVectorizer {
    pub fn num_features(&self) -> usize {
        self.idf.len()
    }

    /// Check internal consistency after deserialization.
    pub fn check(&self) -> Result<()> {
        let (min_n, max_n) = self.ngram_range;
        if min_n == 0 || min_n > max_n {
            anyhow::bail!("invalid ngram_range ({min_n}, {max_n})");
        }
        if self.idf.is_empty() {
            anyhow::bail!("vectorizer has no features");
        }
        if let Some((term, &index)) = self
            .vocabulary
            .iter()
            .find(|(_, index)| **index >= self.idf.len())
        {
            anyhow::bail!(
                "vocabulary term {term:?} maps to feature {index}, but only {} idf values exist",
                self.idf.len()
            );
        }
        Ok(())
    }

    /// Lowercase and fold accents, in that order, as configured.
    pub fn preprocess(&self, text: &str) -> String {
        let text = if self.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };
        match self.strip_accents {
            Some(strip) => strip.apply(&text),
            None => text,
        }
    }

    /// Turn text into a normalised TF-IDF feature vector.
    pub fn transform(&self, text: &str) -> SparseVector {
        let tokens = tokenize(&self.preprocess(text));
        let (min_n, max_n) = self.ngram_range;

        let mut counts: HashMap<usize, f64> = HashMap::new();
        for n in min_n..=max_n {
            for window in tokens.windows(n) {
                let gram = window.join(" ");
                if let Some(&index) = self.vocabulary.get(&gram) {
                    *counts.entry(index).or_insert(0.0) += 1.0;
                }
            }
        }

        let mut features: SparseVector = counts
            .into_iter()
            .map(|(index, count)| {
                let tf = if self.sublinear_tf { 1.0 + count.ln() } else { count };
                (index, tf * self.idf[index])
            })
            .collect();
        features.sort_unstable_by_key(|&(index, _)| index);

        let norm = features.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut features {
                *value /= norm;
            }
        }
        features
    }
}

/// Split preprocessed text into word tokens of at least two characters.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

/// A class label as stored by the trainer: integers (0/1) or strings ("ai").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassLabel {
    Int(i64),
    Text(String),
}

impl fmt::Display for ClassLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Logistic regression over the vectorizer's feature space.
///
/// Binary models store a single coefficient row scoring `classes[1]`;
/// multi-class models store one row per class and use softmax.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub classes: Vec<ClassLabel>,
    pub coef: Vec<Vec<f64>>,
    pub intercept: Vec<f64>,
}

impl LogisticModel {
    pub fn classes(&self) -> &[ClassLabel] {
        &self.classes
    }

    /// Check shapes against each other and against the vectorizer's width.
    pub fn check(&self, num_features: usize) -> Result<()> {
        if self.classes.len() < 2 {
            anyhow::bail!("model needs at least two classes, has {}", self.classes.len());
        }
        let expected_rows = if self.classes.len() == 2 { 1 } else { self.classes.len() };
        if self.coef.len() != expected_rows {
            anyhow::bail!(
                "model has {} coefficient rows, expected {expected_rows} for {} classes",
                self.coef.len(),
                self.classes.len()
            );
        }
        if self.intercept.len() != expected_rows {
            anyhow::bail!(
                "model has {} intercepts, expected {expected_rows}",
                self.intercept.len()
            );
        }
        if let Some(row) = self.coef.iter().find(|row| row.len() != num_features) {
            anyhow::bail!(
                "model coefficient row has {} features, vectorizer produces {num_features}",
                row.len()
            );
        }
        Ok(())
    }

    /// Probability of each class, in `classes` order.
    pub fn predict_proba(&self, features: &[(usize, f64)]) -> Vec<f64> {
        let scores: Vec<f64> = self
            .coef
            .iter()
            .zip(&self.intercept)
            .map(|(row, intercept)| {
                intercept
                    + features
                        .iter()
                        .map(|&(index, value)| row.get(index).copied().unwrap_or(0.0) * value)
                        .sum::<f64>()
            })
            .collect();

        if scores.len() == 1 {
            let positive = sigmoid(scores[0]);
            vec![1.0 - positive, positive]
        } else {
            softmax(&scores)
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// Read both artifact files from `model_dir`.
///
/// Only deserialization happens here; shape checks run when the parts are
/// assembled into a classifier.
pub fn load(model_dir: &Path) -> Result<(TfidfVectorizer, LogisticModel)> {
    let vectorizer = read_json(&model_dir.join(VECTORIZER_FILE))?;
    let model = read_json(&model_dir.join(MODEL_FILE))?;
    Ok((vectorizer, model))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse artifact {}", path.display()))
}
