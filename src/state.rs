use std::path::PathBuf;
use std::sync::Arc;

use crate::classifier::{Classifier, FrameClassifier, build_frame_classifier};
use crate::config::{ChannelOrder, ServiceConfig};
use crate::video::VideoSource;

/// Read-only state shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<dyn Classifier>,
    pub frame_classifier: Arc<dyn FrameClassifier>,
    pub video_source: Arc<dyn VideoSource>,
    pub channel_order: ChannelOrder,
    pub max_upload_bytes: usize,
    pub temp_dir: Option<PathBuf>,
}

impl AppState {
    pub fn new(
        config: &ServiceConfig,
        classifier: Arc<dyn Classifier>,
        video_source: Arc<dyn VideoSource>,
    ) -> Self {
        let frame_classifier = build_frame_classifier(config.frame_classifier, classifier.clone());
        Self {
            classifier,
            frame_classifier,
            video_source,
            channel_order: config.channel_order,
            max_upload_bytes: config.max_upload_bytes,
            temp_dir: config.temp_dir.clone(),
        }
    }

    /// Load the configured backends and build the state from them.
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let classifier = load_classifier(config)?;
        let video_source = load_video_source()?;
        Ok(Self::new(config, classifier, video_source))
    }

    pub fn with_frame_classifier(mut self, frame_classifier: Arc<dyn FrameClassifier>) -> Self {
        self.frame_classifier = frame_classifier;
        self
    }
}

#[cfg(feature = "onnx")]
fn load_classifier(config: &ServiceConfig) -> anyhow::Result<Arc<dyn Classifier>> {
    log::info!("Loading model from {}", config.model_path.display());
    let classifier = crate::onnx::OnnxClassifier::load(
        &config.model_path,
        config.labels.clone(),
        config.intra_threads,
    )
    .inspect_err(|e| {
        log::error!(
            "Model not loaded properly. Please check the model path and file: {:#}",
            e
        )
    })?;
    log::info!("Model loaded successfully.");
    Ok(Arc::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn load_classifier(config: &ServiceConfig) -> anyhow::Result<Arc<dyn Classifier>> {
    anyhow::bail!(
        "cannot load {}: built without the `onnx` feature",
        config.model_path.display()
    )
}

#[cfg(feature = "video")]
fn load_video_source() -> anyhow::Result<Arc<dyn VideoSource>> {
    Ok(Arc::new(crate::gst_source::GstVideoSource::new()?))
}

#[cfg(not(feature = "video"))]
fn load_video_source() -> anyhow::Result<Arc<dyn VideoSource>> {
    log::warn!("Built without the `video` feature; every video upload will be rejected");
    Ok(Arc::new(crate::video::UnsupportedVideoSource))
}
