use anyhow::{bail, Context, Result};
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, RgbImage, RgbaImage};

/// Decodes any supported format into 8-bit RGBA.
pub fn decode_rgba(bytes: &[u8]) -> Result<RgbaImage> {
    if bytes.is_empty() {
        bail!("image payload is empty");
    }
    let image = image::load_from_memory(bytes).context("decode image payload")?;
    Ok(image.into_rgba8())
}

pub fn encode_rgba_png(image: &RgbaImage) -> Result<Vec<u8>> {
    encode_png(image.as_raw(), image.width(), image.height(), ColorType::Rgba8)
}

pub fn encode_rgb_png(image: &RgbImage) -> Result<Vec<u8>> {
    encode_png(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)
}

fn encode_png(raw: &[u8], width: u32, height: u32, color: ColorType) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(raw, width, height, color)
        .with_context(|| format!("encode {width}x{height} png"))?;
    Ok(out)
}
