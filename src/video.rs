//! Per-frame video classification.
//!
//! An upload is written to a [`TempVideo`], opened through a [`VideoSource`],
//! and every decoded frame is preprocessed and labelled by a
//! [`FrameClassifier`]. The frame labels are then reduced with
//! [`majority_vote`].

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::classifier::FrameClassifier;
use crate::config::ChannelOrder;
use crate::error::ApiError;
use crate::preprocess::prepare_image;

/// Aggregate label reported when a video yields no frames.
pub const UNKNOWN_LABEL: &str = "unknown";

#[derive(Debug, Error)]
pub enum VideoError {
    #[error("failed to open video {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },
    #[error("frame classification failed")]
    Classify(#[source] anyhow::Error),
}

impl From<VideoError> for ApiError {
    fn from(e: VideoError) -> Self {
        match e {
            VideoError::Open { .. } => {
                log::warn!("{}", e);
                ApiError::UnreadableVideo
            }
            VideoError::Classify(e) => ApiError::Inference(e),
        }
    }
}

/// Decoded RGB frames in presentation order. Dropping the iterator releases
/// the underlying video handle.
pub type Frames = Box<dyn Iterator<Item = RgbImage>>;

pub trait VideoSource: Send + Sync {
    fn open(&self, path: &Path) -> Result<Frames, VideoError>;
}

/// Used when the binary is built without a video decoder; nothing opens.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedVideoSource;

impl VideoSource for UnsupportedVideoSource {
    fn open(&self, path: &Path) -> Result<Frames, VideoError> {
        Err(VideoError::Open {
            path: path.to_path_buf(),
            reason: "built without video decoding support".to_string(),
        })
    }
}

/// An uploaded video on disk. The file is removed when the guard is dropped.
#[derive(Debug)]
pub struct TempVideo {
    file: Option<NamedTempFile>,
}

impl TempVideo {
    pub fn write(data: &[u8], dir: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("upload-").suffix(".mp4");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(data)?;
        file.flush()?;
        Ok(Self { file: Some(file) })
    }

    pub fn path(&self) -> &Path {
        self.file
            .as_ref()
            .map(|f| f.path())
            .unwrap_or_else(|| Path::new(""))
    }
}

impl Drop for TempVideo {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            if let Err(e) = file.close() {
                log::error!("Failed to remove temporary video {}: {}", path.display(), e);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoPrediction {
    pub prediction: String,
    pub all_frame_predictions: Vec<String>,
}

/// Most frequent label. Among equally frequent labels the one seen first wins.
pub fn majority_vote(labels: &[String]) -> Option<&str> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut slots: HashMap<&str, usize> = HashMap::new();
    for label in labels {
        match slots.get(label.as_str()) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                slots.insert(label.as_str(), counts.len());
                counts.push((label.as_str(), 1));
            }
        }
    }
    counts
        .into_iter()
        .fold(None, |best, (label, n)| match best {
            Some((_, best_n)) if n <= best_n => best,
            _ => Some((label, n)),
        })
        .map(|(label, _)| label)
}

pub fn predict_frames(
    frames: impl Iterator<Item = RgbImage>,
    classifier: &dyn FrameClassifier,
    order: ChannelOrder,
) -> Result<VideoPrediction, VideoError> {
    let mut all_frame_predictions = Vec::new();
    for frame in frames {
        let tensor = prepare_image(&frame, order);
        let label = classifier
            .classify_frame(&tensor)
            .map_err(VideoError::Classify)?;
        all_frame_predictions.push(label);
    }

    let prediction = majority_vote(&all_frame_predictions)
        .unwrap_or(UNKNOWN_LABEL)
        .to_string();
    log::info!(
        "Classified {} frames, majority label {}",
        all_frame_predictions.len(),
        prediction
    );
    Ok(VideoPrediction {
        prediction,
        all_frame_predictions,
    })
}

/// Open `video` and classify every frame. The frame stream is dropped before
/// this returns; the caller still owns the temp file.
pub fn predict_video(
    source: &dyn VideoSource,
    video: &TempVideo,
    classifier: &dyn FrameClassifier,
    order: ChannelOrder,
) -> Result<VideoPrediction, VideoError> {
    let frames = source.open(video.path())?;
    predict_frames(frames, classifier, order)
}
