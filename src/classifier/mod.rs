// Classification: trait-based abstraction over the trained model.
//
// The AiClassifier trait is the "text in, probability out" seam. The default
// implementation is LinearClassifier (TF-IDF + logistic regression loaded
// from JSON). Detector wraps any implementation with the decision threshold
// and checks its output before a verdict is reported.

pub mod artifact;
pub mod linear;

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

pub use linear::LinearClassifier;

/// Trait for scoring how likely a text is to be AI-written.
#[async_trait]
pub trait AiClassifier: Send + Sync {
    /// Probability in [0, 1] that `text` is AI-generated.
    async fn ai_probability(&self, text: &str) -> Result<f64>;
}

/// Binary human-facing label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    Ai,
    Human,
}

impl Verdict {
    /// `Ai` iff `probability >= threshold`.
    pub fn from_probability(probability: f64, threshold: f64) -> Self {
        if probability >= threshold {
            Self::Ai
        } else {
            Self::Human
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Ai => "AI Generated",
            Self::Human => "Human Written",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Probability that a text is AI-written, and the resulting verdict.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub probability: f64,
    pub verdict: Verdict,
}

impl Classification {
    /// Probability as a percentage rounded to one decimal place.
    pub fn ai_percent(&self) -> f64 {
        (self.probability * 1000.0).round() / 10.0
    }
}

/// A classifier plus the threshold that turns its probability into a verdict.
#[derive(Clone)]
pub struct Detector {
    classifier: Arc<dyn AiClassifier>,
    threshold: f64,
}

impl Detector {
    pub fn new(classifier: Arc<dyn AiClassifier>, threshold: f64) -> Self {
        Self {
            classifier,
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Classify a validated text.
    ///
    /// A probability outside [0, 1] (or NaN) means the artifact is broken and
    /// is reported as an error rather than clamped.
    pub async fn classify(&self, text: &str) -> Result<Classification> {
        let probability = self.classifier.ai_probability(text).await?;
        if !(0.0..=1.0).contains(&probability) {
            anyhow::bail!("Classifier returned probability {probability} outside [0, 1]");
        }

        Ok(Classification {
            probability,
            verdict: Verdict::from_probability(probability, self.threshold),
        })
    }
}
