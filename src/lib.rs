pub mod classifier;
pub mod config;
pub mod error;
#[cfg(feature = "video")]
pub mod gst_source;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod preprocess;
pub mod server;
pub mod state;
pub mod upload;
pub mod video;
