use std::sync::Arc;

use anyhow::{anyhow, bail};
use ndarray::{Array2, Array4};
use rand::seq::IndexedRandom;

use crate::config::{FrameClassifierKind, MOCK_FRAME_LABELS};
use crate::preprocess::ImageTensor;

/// An opaque image classifier.
///
/// Implementations are shared across requests and must be safe to call
/// concurrently through `&self`.
pub trait Classifier: Send + Sync {
    /// Labels index-aligned with the model output.
    fn labels(&self) -> &[String];

    /// Run the model on a `[batch, H, W, 3]` tensor and return one probability
    /// row per batch entry, shape `[batch, labels().len()]`.
    fn predict(&self, batch: &Array4<f32>) -> anyhow::Result<Array2<f32>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub confidence: f32,
}

/// Index and value of the largest probability; the first one wins on ties.
pub fn argmax(probs: &[f32]) -> Option<(usize, f32)> {
    probs
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, p)| match best {
            Some((_, best_p)) if p <= best_p => best,
            _ => Some((i, p)),
        })
}

pub fn select_label(labels: &[String], probs: &[f32]) -> anyhow::Result<Prediction> {
    if probs.len() != labels.len() {
        bail!(
            "model produced {} scores for {} labels",
            probs.len(),
            labels.len()
        );
    }
    let (idx, confidence) = argmax(probs).ok_or_else(|| anyhow!("model produced no scores"))?;
    Ok(Prediction {
        label: labels[idx].clone(),
        confidence,
    })
}

/// Classify one preprocessed image: add the batch dimension, run the model,
/// take the most probable label.
pub fn classify(classifier: &dyn Classifier, image: &ImageTensor) -> anyhow::Result<Prediction> {
    let probs = classifier.predict(&image.to_batch())?;
    let row = probs
        .rows()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow!("model returned an empty batch"))?;
    select_label(classifier.labels(), &row.to_vec())
}

/// Produces one label per video frame.
pub trait FrameClassifier: Send + Sync {
    fn classify_frame(&self, frame: &ImageTensor) -> anyhow::Result<String>;
}

/// Stand-in for per-frame inference: a uniform random pick from a fixed label
/// subset. The frame content is ignored.
#[derive(Debug, Clone)]
pub struct RandomFrameClassifier {
    labels: Vec<String>,
}

impl RandomFrameClassifier {
    pub fn new(labels: Vec<String>) -> anyhow::Result<Self> {
        if labels.is_empty() {
            bail!("random frame classifier needs at least one label");
        }
        Ok(Self { labels })
    }
}

impl Default for RandomFrameClassifier {
    fn default() -> Self {
        Self {
            labels: MOCK_FRAME_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }
}

impl FrameClassifier for RandomFrameClassifier {
    fn classify_frame(&self, _frame: &ImageTensor) -> anyhow::Result<String> {
        let mut rng = rand::rng();
        self.labels
            .choose(&mut rng)
            .cloned()
            .ok_or_else(|| anyhow!("no labels to choose from"))
    }
}

/// Runs the shared classifier on each frame.
#[derive(Clone)]
pub struct ModelFrameClassifier {
    classifier: Arc<dyn Classifier>,
}

impl ModelFrameClassifier {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }
}

impl FrameClassifier for ModelFrameClassifier {
    fn classify_frame(&self, frame: &ImageTensor) -> anyhow::Result<String> {
        classify(self.classifier.as_ref(), frame).map(|p| p.label)
    }
}

pub fn build_frame_classifier(
    kind: FrameClassifierKind,
    classifier: Arc<dyn Classifier>,
) -> Arc<dyn FrameClassifier> {
    match kind {
        FrameClassifierKind::Mock => Arc::new(RandomFrameClassifier::default()),
        FrameClassifierKind::Model => Arc::new(ModelFrameClassifier::new(classifier)),
    }
}
