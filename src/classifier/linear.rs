// Linear (TF-IDF + logistic regression) classifier backed by the JSON artifact.
//
// The artifact is loaded once and shared read-only. Vectorization and scoring
// are CPU-bound, so they run on the blocking pool to keep the async runtime
// responsive under concurrent requests.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use super::artifact::{self, ClassLabel, LogisticModel, TfidfVectorizer};
use super::AiClassifier;
use crate::output::truncate_chars;

struct Artifact {
    vectorizer: TfidfVectorizer,
    model: LogisticModel,
    /// Position of the AI class in `model.classes`, resolved at load time.
    ai_index: usize,
}

pub struct LinearClassifier {
    artifact: Arc<Artifact>,
}

impl LinearClassifier {
    /// Load `text_vectorizer.json` and `text_model.json` from `model_dir`.
    ///
    /// Fails if either file is missing or malformed, or if the model has no
    /// class labelled `ai_label`.
    pub fn load(model_dir: &Path, ai_label: &str) -> Result<Self> {
        let (vectorizer, model) = artifact::load(model_dir)?;
        let classifier = Self::from_parts(vectorizer, model, ai_label)?;

        info!(
            model_dir = %model_dir.display(),
            features = classifier.num_features(),
            ai_index = classifier.ai_index(),
            "Loaded text classifier"
        );
        Ok(classifier)
    }

    /// Build a classifier from already-deserialized parts, checking their
    /// shapes against each other.
    pub fn from_parts(
        vectorizer: TfidfVectorizer,
        model: LogisticModel,
        ai_label: &str,
    ) -> Result<Self> {
        vectorizer.check().context("Invalid vectorizer artifact")?;
        model
            .check(vectorizer.num_features())
            .context("Invalid model artifact")?;
        let ai_index = resolve_ai_index(model.classes(), ai_label)?;

        Ok(Self {
            artifact: Arc::new(Artifact {
                vectorizer,
                model,
                ai_index,
            }),
        })
    }

    pub fn ai_index(&self) -> usize {
        self.artifact.ai_index
    }

    pub fn classes(&self) -> &[ClassLabel] {
        self.artifact.model.classes()
    }

    pub fn num_features(&self) -> usize {
        self.artifact.vectorizer.num_features()
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.artifact.vectorizer.ngram_range
    }

    /// Synchronous scoring, shared by the async trait impl and the CLI.
    pub fn score(&self, text: &str) -> f64 {
        score(&self.artifact, text)
    }
}

fn score(artifact: &Artifact, text: &str) -> f64 {
    let features = artifact.vectorizer.transform(text);
    let proba = artifact.model.predict_proba(&features);
    let ai_probability = proba[artifact.ai_index];

    debug!(
        features = features.len(),
        ai_probability,
        text_preview = %truncate_chars(text, 50),
        "Scored text"
    );
    ai_probability
}

/// Find which class index means "AI", by label rather than position.
/// Class order is whatever the trainer happened to sort them into.
pub fn resolve_ai_index(classes: &[ClassLabel], ai_label: &str) -> Result<usize> {
    classes
        .iter()
        .position(|class| class.to_string() == ai_label)
        .with_context(|| {
            let known: Vec<String> = classes.iter().map(ToString::to_string).collect();
            format!(
                "Model has no class labelled {ai_label:?} (classes: {}). Set AUTHORSHIP_AI_LABEL to the AI class label.",
                known.join(", ")
            )
        })
}

#[async_trait]
impl AiClassifier for LinearClassifier {
    async fn ai_probability(&self, text: &str) -> Result<f64> {
        let artifact = Arc::clone(&self.artifact);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || score(&artifact, &text))
            .await
            .context("spawn_blocking panicked")
    }
}
