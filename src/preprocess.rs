//! Image decoding and model input preparation.
//!
//! Every image, whether uploaded directly or taken from a video frame, goes
//! through the same steps:
//! 1. Resize to `IMAGE_SIZE` x `IMAGE_SIZE` (bilinear)
//! 2. Rescale by 1/255
//! 3. Lay out as HWC in the configured channel order
//!
//! The batch dimension is added separately with [`ImageTensor::to_batch`].

use image::{RgbImage, imageops, imageops::FilterType};
use ndarray::{Array3, Array4, ArrayView3, Axis};

use crate::config::ChannelOrder;
use crate::error::ApiError;

/// Side length the classifier expects.
pub const IMAGE_SIZE: u32 = 128;

/// A single preprocessed image, shape `[IMAGE_SIZE, IMAGE_SIZE, 3]`, values in [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor(Array3<f32>);

impl ImageTensor {
    pub fn view(&self) -> ArrayView3<'_, f32> {
        self.0.view()
    }

    /// Shape `[1, IMAGE_SIZE, IMAGE_SIZE, 3]`.
    pub fn to_batch(&self) -> Array4<f32> {
        self.0.clone().insert_axis(Axis(0))
    }
}

/// Decode raw upload bytes into an RGB image. The format is sniffed from the content.
pub fn decode_image(bytes: &[u8]) -> Result<RgbImage, ApiError> {
    image::load_from_memory(bytes)
        .map(|img| img.to_rgb8())
        .map_err(ApiError::InvalidImage)
}

pub fn prepare_image(image: &RgbImage, order: ChannelOrder) -> ImageTensor {
    let resized = imageops::resize(image, IMAGE_SIZE, IMAGE_SIZE, FilterType::Triangle);
    let size = IMAGE_SIZE as usize;
    let tensor = Array3::from_shape_fn((size, size, 3), |(y, x, c)| {
        let pixel = resized.get_pixel(x as u32, y as u32);
        let channel = match order {
            ChannelOrder::Bgr => 2 - c,
            ChannelOrder::Rgb => c,
        };
        pixel[channel] as f32 / 255.0
    });
    ImageTensor(tensor)
}
