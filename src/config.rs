use std::path::PathBuf;

use clap::ValueEnum;

pub const DEFAULT_MODEL_PATH: &str = "driver_attention_cnn_model.onnx";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Labels the per-frame stand-in draws from.
pub const MOCK_FRAME_LABELS: [&str; 3] = ["c1", "c2", "c3"];

pub fn default_labels() -> Vec<String> {
    (0..10).map(|i| format!("c{}", i)).collect()
}

/// Channel layout written into the model input tensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ChannelOrder {
    /// OpenCV order, which the shipped model was trained on.
    #[default]
    Bgr,
    Rgb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum FrameClassifierKind {
    /// Random pick from `MOCK_FRAME_LABELS`.
    #[default]
    Mock,
    /// Run the loaded classifier on every frame.
    Model,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for field '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub model_path: PathBuf,
    pub labels: Vec<String>,
    pub channel_order: ChannelOrder,
    pub frame_classifier: FrameClassifierKind,
    pub max_upload_bytes: usize,
    pub temp_dir: Option<PathBuf>,
    pub intra_threads: usize,
    pub log_level: log::LevelFilter,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            labels: default_labels(),
            channel_order: ChannelOrder::default(),
            frame_classifier: FrameClassifierKind::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            temp_dir: None,
            intra_threads: 4,
            log_level: log::LevelFilter::Info,
        }
    }
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.labels.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "labels",
                reason: "at least one label is required".to_string(),
            });
        }
        if let Some(label) = self.labels.iter().find(|l| l.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "labels",
                reason: format!("blank label {:?}", label),
            });
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.max_upload_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_upload_bytes",
                reason: "must be non-zero".to_string(),
            });
        }
        if self.intra_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "intra_threads",
                reason: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}
