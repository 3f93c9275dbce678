#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use driver_attention_api::classifier::{Classifier, FrameClassifier};
use driver_attention_api::config::{ServiceConfig, default_labels};
use driver_attention_api::preprocess::ImageTensor;
use driver_attention_api::state::AppState;
use driver_attention_api::video::{Frames, VideoError, VideoSource};
use image::{ImageFormat, Rgb, RgbImage};
use ndarray::{Array2, Array4};

pub const BOUNDARY: &str = "----driver-attention-test-boundary";

/// Classifier that returns the same probability row for every input.
pub struct FixedClassifier {
    pub labels: Vec<String>,
    pub probs: Vec<f32>,
}

impl FixedClassifier {
    /// Ten labels with `winner` holding `confidence` and the rest sharing what is left.
    pub fn peaked(winner: usize, confidence: f32) -> Self {
        let labels = default_labels();
        let rest = (1.0 - confidence) / (labels.len() - 1) as f32;
        let probs = (0..labels.len())
            .map(|i| if i == winner { confidence } else { rest })
            .collect();
        Self { labels, probs }
    }
}

impl Classifier for FixedClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn predict(&self, batch: &Array4<f32>) -> anyhow::Result<Array2<f32>> {
        anyhow::ensure!(
            batch.shape() == [1, 128, 128, 3],
            "unexpected input shape {:?}",
            batch.shape()
        );
        Ok(Array2::from_shape_vec(
            (1, self.probs.len()),
            self.probs.clone(),
        )?)
    }
}

pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn labels(&self) -> &[String] {
        &[]
    }

    fn predict(&self, _batch: &Array4<f32>) -> anyhow::Result<Array2<f32>> {
        anyhow::bail!("runtime exploded")
    }
}

/// Cycles through a fixed list of labels, one per frame.
pub struct CyclingFrames {
    labels: Vec<String>,
    next: Mutex<usize>,
}

impl CyclingFrames {
    pub fn new(labels: &[&str]) -> Self {
        Self {
            labels: labels.iter().map(|l| l.to_string()).collect(),
            next: Mutex::new(0),
        }
    }
}

impl FrameClassifier for CyclingFrames {
    fn classify_frame(&self, frame: &ImageTensor) -> anyhow::Result<String> {
        assert_eq!(frame.view().shape(), &[128, 128, 3]);
        let mut next = self.next.lock().unwrap();
        let label = self.labels[*next % self.labels.len()].clone();
        *next += 1;
        Ok(label)
    }
}

/// Video source that yields `frames` black frames, or fails to open when
/// `frames` is `None`. Records every path it was asked to open and whether the
/// file existed at that point.
pub struct MockVideoSource {
    frames: Option<usize>,
    pub opened: Mutex<Vec<(PathBuf, bool)>>,
}

impl MockVideoSource {
    pub fn with_frames(n: usize) -> Self {
        Self {
            frames: Some(n),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn unreadable() -> Self {
        Self {
            frames: None,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn opened_paths(&self) -> Vec<(PathBuf, bool)> {
        self.opened.lock().unwrap().clone()
    }
}

impl VideoSource for MockVideoSource {
    fn open(&self, path: &Path) -> Result<Frames, VideoError> {
        self.opened
            .lock()
            .unwrap()
            .push((path.to_path_buf(), path.exists()));
        match self.frames {
            Some(n) => Ok(Box::new(
                (0..n).map(|_| RgbImage::from_pixel(320, 240, Rgb([0, 0, 0]))),
            )),
            None => Err(VideoError::Open {
                path: path.to_path_buf(),
                reason: "mock source refuses to open".to_string(),
            }),
        }
    }
}

pub fn test_state(
    classifier: Arc<dyn Classifier>,
    video_source: Arc<dyn VideoSource>,
    temp_dir: &Path,
) -> AppState {
    let config = ServiceConfig {
        temp_dir: Some(temp_dir.to_path_buf()),
        max_upload_bytes: 1024 * 1024,
        ..Default::default()
    };
    AppState::new(&config, classifier, video_source)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([40, 90, 200]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

/// One multipart part: field name, optional filename, content.
pub struct Part<'a> {
    pub name: &'a str,
    pub filename: Option<&'a str>,
    pub data: &'a [u8],
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        let disposition = match part.filename {
            Some(filename) => format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                part.name, filename
            ),
            None => format!("Content-Disposition: form-data; name=\"{}\"\r\n", part.name),
        };
        body.extend_from_slice(disposition.as_bytes());
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn file_body(filename: &str, data: &[u8]) -> Vec<u8> {
    multipart_body(&[Part {
        name: "file",
        filename: Some(filename),
        data,
    }])
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}
