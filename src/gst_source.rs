use std::path::Path;

use anyhow::Context;
use gstreamer as gst;
use gstreamer::prelude::*;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use image::RgbImage;

use crate::video::{Frames, VideoError, VideoSource};

/// Decodes video files with a `filesrc ! decodebin ! videoconvert ! appsink`
/// pipeline, pulling RGB frames synchronously.
#[derive(Debug, Clone)]
pub struct GstVideoSource {
    open_timeout: gst::ClockTime,
    poll_interval: gst::ClockTime,
}

impl GstVideoSource {
    pub fn new() -> anyhow::Result<Self> {
        gst::init().context("failed to initialise GStreamer")?;
        Ok(Self {
            open_timeout: gst::ClockTime::from_seconds(10),
            poll_interval: gst::ClockTime::from_mseconds(100),
        })
    }
}

// Copy the frame row by row when rows carry stride padding.
fn contiguous_rgb(info: &VideoInfo, src: &[u8]) -> Vec<u8> {
    let width = info.width() as usize;
    let height = info.height() as usize;
    let row = width * 3;
    let stride = info.stride().first().map(|&s| s as usize).unwrap_or(row);
    if stride == row {
        return src[..(row * height).min(src.len())].to_vec();
    }

    let mut out = Vec::with_capacity(row * height);
    for y in 0..height {
        let start = (y * stride).min(src.len());
        let end = (start + row).min(src.len());
        out.extend_from_slice(&src[start..end]);
        out.resize(out.len() + row - (end - start), 0);
    }
    out
}

fn sample_to_rgb(sample: &gst::Sample) -> Option<RgbImage> {
    let buffer = sample.buffer()?;
    let caps = sample.caps()?;
    let info = VideoInfo::from_caps(caps).ok()?;
    let map = buffer.map_readable().ok()?;
    RgbImage::from_raw(info.width(), info.height(), contiguous_rgb(&info, map.as_slice()))
}

struct GstFrames {
    pipeline: gst::Pipeline,
    appsink: AppSink,
    poll_interval: gst::ClockTime,
}

impl GstFrames {
    fn build(path: &Path, poll_interval: gst::ClockTime) -> anyhow::Result<Self> {
        let pipeline = gst::Pipeline::new();
        let source = gst::ElementFactory::make("filesrc")
            .property("location", path.to_string_lossy().into_owned())
            .build()
            .context("failed to create filesrc")?;
        let decodebin = gst::ElementFactory::make("decodebin")
            .build()
            .context("failed to create decodebin")?;
        let convert = gst::ElementFactory::make("videoconvert")
            .build()
            .context("failed to create videoconvert")?;
        let appsink = AppSink::builder()
            .caps(
                &gst::Caps::builder("video/x-raw")
                    .field("format", "RGB")
                    .build(),
            )
            .sync(false)
            .build();

        pipeline.add_many([&source, &decodebin, &convert, appsink.upcast_ref::<gst::Element>()])?;
        source.link(&decodebin)?;
        convert.link(&appsink)?;

        let convert_clone = convert.clone();
        decodebin.connect_pad_added(move |_, src_pad| {
            let is_video = src_pad
                .current_caps()
                .and_then(|caps| {
                    caps.structure(0)
                        .map(|s| s.name().as_str().starts_with("video/"))
                })
                .unwrap_or(false);
            if !is_video {
                return;
            }
            let Some(sink_pad) = convert_clone.static_pad("sink") else {
                return;
            };
            if sink_pad.is_linked() {
                return;
            }
            if let Err(e) = src_pad.link(&sink_pad) {
                log::warn!("Failed to link decoded video pad: {:?}", e);
            }
        });

        Ok(Self {
            pipeline,
            appsink,
            poll_interval,
        })
    }

    /// Preroll the pipeline; fails if the file cannot be demuxed or decoded.
    fn start(&self, timeout: gst::ClockTime) -> anyhow::Result<()> {
        self.pipeline
            .set_state(gst::State::Paused)
            .context("pipeline refused to pause")?;
        let (result, _, _) = self.pipeline.state(timeout);
        result.context("pipeline failed to preroll")?;
        self.pipeline
            .set_state(gst::State::Playing)
            .context("pipeline refused to play")?;
        Ok(())
    }

    fn pipeline_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        let msg = bus.pop_filtered(&[gst::MessageType::Error])?;
        match msg.view() {
            gst::MessageView::Error(err) => Some(err.error().to_string()),
            _ => None,
        }
    }
}

impl Iterator for GstFrames {
    type Item = RgbImage;

    fn next(&mut self) -> Option<RgbImage> {
        loop {
            if let Some(sample) = self.appsink.try_pull_sample(self.poll_interval) {
                match sample_to_rgb(&sample) {
                    Some(frame) => return Some(frame),
                    None => {
                        log::warn!("Skipping frame that could not be mapped to RGB");
                        continue;
                    }
                }
            }
            if self.appsink.is_eos() {
                return None;
            }
            if let Some(err) = self.pipeline_error() {
                log::warn!("Video decoding stopped early: {}", err);
                return None;
            }
        }
    }
}

impl Drop for GstFrames {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            log::error!("Failed to release video pipeline: {:?}", e);
        }
    }
}

impl VideoSource for GstVideoSource {
    fn open(&self, path: &Path) -> Result<Frames, VideoError> {
        let open_error = |e: anyhow::Error| VideoError::Open {
            path: path.to_path_buf(),
            reason: format!("{:#}", e),
        };
        let frames = GstFrames::build(path, self.poll_interval).map_err(open_error)?;
        frames.start(self.open_timeout).map_err(open_error)?;
        Ok(Box::new(frames))
    }
}
