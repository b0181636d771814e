//! Resizing helpers shared by model preprocessing and mask resampling.

use anyhow::{bail, Result};
use fast_image_resize::{
    images::{CroppedImageMut, Image as FirImage},
    pixels::PixelType,
    FilterType, ResizeAlg, ResizeOptions, Resizer,
};
use image::RgbImage;
use ndarray::Array;
use crate::detection_runners::input_wrapper::X;

/// Grey level used to pad the letterboxed model input.
pub const LETTERBOX_FILL: u8 = 114;

/// How an image was fitted into the square model input.
///
/// The image is scaled uniformly and anchored at the top-left corner; everything right
/// of `new_w` and below `new_h` is padding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub width_src: u32,
    pub height_src: u32,
    pub size_dst: u32,
    pub scale: f32,
    pub new_w: u32,
    pub new_h: u32,
}

impl Letterbox {
    pub fn new(width_src: u32, height_src: u32, size_dst: u32) -> Self {
        let scale = (size_dst as f32 / width_src as f32).min(size_dst as f32 / height_src as f32);
        let new_w = ((width_src as f32 * scale).round() as u32).clamp(1, size_dst);
        let new_h = ((height_src as f32 * scale).round() as u32).clamp(1, size_dst);
        Self { width_src, height_src, size_dst, scale, new_w, new_h }
    }
}

pub fn to_fir_image(image: RgbImage) -> Result<FirImage<'static>> {
    let (width, height) = image.dimensions();
    Ok(FirImage::from_vec_u8(width, height, image.into_raw(), PixelType::U8x3)?)
}

/// Letterboxes `image` into a `size x size` canvas and returns it as a `(1, 3, size, size)`
/// tensor scaled to `[0, 1]`.
pub fn preprocess(image: RgbImage, size: u32) -> Result<(X, Letterbox)> {
    let letterbox = Letterbox::new(image.width(), image.height(), size);
    let src = to_fir_image(image)?;

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut resizer = Resizer::new();
    let padded = letterbox_image(&src, &letterbox, &mut resizer, &options)?;

    let x = nchw_normalize(&padded)?;
    Ok((x, letterbox))
}

fn letterbox_image(
    img: &FirImage,
    letterbox: &Letterbox,
    resizer: &mut Resizer,
    resize_options: &ResizeOptions,
) -> Result<FirImage<'static>> {
    let size = letterbox.size_dst;
    let mut padded = FirImage::from_vec_u8(
        size,
        size,
        vec![LETTERBOX_FILL; (size * size * 3) as usize],
        PixelType::U8x3,
    )?;

    let mut cropped = CroppedImageMut::new(&mut padded, 0, 0, letterbox.new_w, letterbox.new_h)?;
    resizer.resize(img, &mut cropped, resize_options)?;

    Ok(padded)
}

fn nchw_normalize(img: &FirImage) -> Result<X> {
    let buf = img.buffer();
    let w = img.width() as usize;
    let h = img.height() as usize;

    if buf.len() != w * h * 3 {
        bail!("Unexpected buffer size: got {}, expected {}", buf.len(), w * h * 3);
    }

    let hw = w * h;
    let mut out = vec![0.0f32; buf.len()];
    for i in 0..hw {
        out[i] = buf[3 * i] as f32 / 255.0;
        out[i + hw] = buf[3 * i + 1] as f32 / 255.0;
        out[i + 2 * hw] = buf[3 * i + 2] as f32 / 255.0;
    }

    Ok(X::from(Array::from_shape_vec((1, 3, h, w), out)?.into_dyn()))
}

/// Nearest-neighbour resize of a single-channel `u8` plane.
pub fn resize_nearest_u8(
    plane: Vec<u8>,
    width_src: u32,
    height_src: u32,
    width_dst: u32,
    height_dst: u32,
) -> Result<Vec<u8>> {
    if width_src == width_dst && height_src == height_dst {
        return Ok(plane);
    }

    let src = FirImage::from_vec_u8(width_src, height_src, plane, PixelType::U8)?;
    let mut dst = FirImage::new(width_dst, height_dst, PixelType::U8);
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Nearest);
    Resizer::new().resize(&src, &mut dst, &options)?;

    Ok(dst.into_vec())
}
