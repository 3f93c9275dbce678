use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, anyhow, bail};
use ndarray::{Array2, Array4};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use crate::classifier::Classifier;

/// Classifier backed by an ONNX Runtime session. Expects an NHWC float input
/// and a single `[batch, classes]` probability output.
pub struct OnnxClassifier {
    // `Session::run` needs exclusive access.
    session: Mutex<Session>,
    labels: Vec<String>,
}

impl OnnxClassifier {
    pub fn load(path: &Path, labels: Vec<String>, intra_threads: usize) -> anyhow::Result<Self> {
        if !path.exists() {
            bail!("model file not found: {}", path.display());
        }
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?
            .commit_from_file(path)
            .with_context(|| format!("failed to load model from {}", path.display()))?;
        Ok(Self {
            session: Mutex::new(session),
            labels,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, batch: &Array4<f32>) -> anyhow::Result<Array2<f32>> {
        let (n, h, w, c) = batch.dim();
        let data: Vec<f32> = batch.iter().copied().collect();
        let input = Tensor::from_array(([n, h, w, c], data))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("model session lock poisoned"))?;
        let outputs = session.run(ort::inputs![input])?;
        let (_, scores) = outputs[0].try_extract_tensor::<f32>()?;

        if n == 0 || scores.len() % n != 0 {
            bail!("model output of {} values does not split into {} rows", scores.len(), n);
        }
        Ok(Array2::from_shape_vec((n, scores.len() / n), scores.to_vec())?)
    }
}
