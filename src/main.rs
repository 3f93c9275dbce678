use std::path::PathBuf;

use clap::Parser;
use driver_attention_api::config::{
    ChannelOrder, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL_PATH, FrameClassifierKind,
    ServiceConfig, default_labels,
};
use driver_attention_api::server::{init_logging, startup};
use driver_attention_api::state::AppState;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(
        long,
        default_value = "127.0.0.1",
        help = "Host address to bind the server to"
    )]
    host: String,

    #[arg(long, default_value_t = 5000, help = "Port number to listen on")]
    port: u16,

    #[arg(long, default_value = DEFAULT_MODEL_PATH, help = "Path to the ONNX classifier")]
    model_path: PathBuf,

    #[arg(
        long,
        value_delimiter = ',',
        help = "Comma-separated class labels, index-aligned with the model output (default: c0..c9)"
    )]
    labels: Vec<String>,

    #[arg(
        long,
        default_value_t = ChannelOrder::Bgr,
        value_enum,
        help = "Channel order of the model input: bgr or rgb"
    )]
    channel_order: ChannelOrder,

    #[arg(
        long,
        default_value_t = FrameClassifierKind::Mock,
        value_enum,
        help = "Per-frame video classifier: mock (random c1/c2/c3) or model"
    )]
    frame_classifier: FrameClassifierKind,

    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, help = "Maximum accepted upload size in bytes")]
    max_upload_bytes: usize,

    #[arg(long, help = "Directory for temporary video files (default: system temp dir)")]
    temp_dir: Option<PathBuf>,

    #[arg(long, default_value_t = 4, help = "ONNX Runtime intra-op threads")]
    intra_threads: usize,

    #[arg(
        long,
        default_value = "info",
        help = "Log level: off, error, warn, info, debug or trace"
    )]
    log_level: log::LevelFilter,
}

impl Args {
    fn into_config(self) -> ServiceConfig {
        ServiceConfig {
            host: self.host,
            port: self.port,
            model_path: self.model_path,
            labels: if self.labels.is_empty() {
                default_labels()
            } else {
                self.labels
            },
            channel_order: self.channel_order,
            frame_classifier: self.frame_classifier,
            max_upload_bytes: self.max_upload_bytes,
            temp_dir: self.temp_dir,
            intra_threads: self.intra_threads,
            log_level: self.log_level,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config();
    init_logging(config.log_level);

    let app_state = AppState::from_config(&config)?;
    actix_web::rt::System::new().block_on(startup(config, app_state))?;
    Ok(())
}
