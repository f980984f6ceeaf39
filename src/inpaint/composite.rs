use anyhow::Result;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::thread::{self, ScopedJoinHandle};

use crate::inpaint::codec;
use crate::inpaint::error::{CompositeError, ImageRole};
use crate::inpaint::mask::Mask;

/// Filter used when the service returns a different resolution than was sent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl ResampleFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResampleFilter::Nearest => FilterType::Nearest,
            ResampleFilter::Triangle => FilterType::Triangle,
            ResampleFilter::CatmullRom => FilterType::CatmullRom,
            ResampleFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Merges an inpainted replacement back into the original through a mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Compositor {
    filter: ResampleFilter,
}

impl Compositor {
    pub fn new(filter: ResampleFilter) -> Self {
        Self { filter }
    }

    /// Pixels with zero mask coverage come out exactly as in `original`; full
    /// coverage takes the (resampled) replacement pixel. Inputs are untouched and
    /// the result always has the original's dimensions.
    pub fn composite(&self, original: &RgbaImage, mask: &Mask, replacement: &RgbaImage) -> RgbaImage {
        let (width, height) = original.dimensions();
        let mask = mask.resized(width, height);
        let mut layer = self.resample(replacement, width, height);
        apply_mask_alpha(&mut layer, &mask);

        let mut output = original.clone();
        blend_in_place(&mut output, &layer);
        output
    }

    /// Decodes all three inputs concurrently, composites, and encodes the result
    /// as PNG. Any failure fails the whole operation.
    pub fn composite_encoded(
        &self,
        original: &[u8],
        mask: &[u8],
        replacement: &[u8],
    ) -> Result<Vec<u8>, CompositeError> {
        let (original, mask, replacement) = thread::scope(|scope| {
            let original = scope.spawn(|| codec::decode_rgba(original));
            let mask = scope.spawn(|| Mask::decode(mask));
            let replacement = scope.spawn(|| codec::decode_rgba(replacement));
            (
                joined(original, ImageRole::Original),
                joined(mask, ImageRole::Mask),
                joined(replacement, ImageRole::Replacement),
            )
        });
        let (original, mask, replacement) = (original?, mask?, replacement?);

        if mask.dimensions() != original.dimensions() {
            tracing::debug!(
                mask = ?mask.dimensions(),
                original = ?original.dimensions(),
                "resampling mask to original size"
            );
        }
        if replacement.dimensions() != original.dimensions() {
            tracing::debug!(
                replacement = ?replacement.dimensions(),
                original = ?original.dimensions(),
                filter = ?self.filter,
                "resampling replacement to original size"
            );
        }

        let output = self.composite(&original, &mask, &replacement);
        codec::encode_rgba_png(&output).map_err(CompositeError::Encode)
    }

    fn resample(&self, image: &RgbaImage, width: u32, height: u32) -> RgbaImage {
        if image.dimensions() == (width, height) {
            image.clone()
        } else {
            imageops::resize(image, width, height, self.filter.filter_type())
        }
    }
}

fn joined<T>(
    handle: ScopedJoinHandle<'_, Result<T>>,
    role: ImageRole,
) -> Result<T, CompositeError> {
    match handle.join() {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(CompositeError::Decode { role, source }),
        Err(_) => Err(CompositeError::DecoderPanicked { role }),
    }
}

/// Destination-in: scales each layer pixel's alpha by the mask coverage, so
/// preserve pixels become fully transparent.
pub fn apply_mask_alpha(layer: &mut RgbaImage, mask: &Mask) {
    assert_eq!(layer.dimensions(), mask.dimensions());

    for (x, y, pixel) in layer.enumerate_pixels_mut() {
        let coverage = mask.coverage(x, y) as u32;
        let alpha = pixel.0[3] as u32;
        pixel.0[3] = ((alpha * coverage + 127) / 255) as u8;
    }
}

/// Source-over of `top` onto `base`.
fn blend_in_place(base: &mut RgbaImage, top: &RgbaImage) {
    assert_eq!(base.dimensions(), top.dimensions());

    for (dst, src) in base.pixels_mut().zip(top.pixels()) {
        *dst = blend_pixel(*dst, *src);
    }
}

fn blend_pixel(bottom: Rgba<u8>, top: Rgba<u8>) -> Rgba<u8> {
    match top.0[3] {
        0 => return bottom,
        255 => return top,
        _ => {}
    }

    let sa = top.0[3] as f32 / 255.0;
    let da = bottom.0[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);

    let blend = |s: u8, d: u8| -> u8 {
        (((s as f32 * sa) + (d as f32 * da * (1.0 - sa))) / out_a)
            .round()
            .clamp(0.0, 255.0) as u8
    };

    Rgba([
        blend(top.0[0], bottom.0[0]),
        blend(top.0[1], bottom.0[1]),
        blend(top.0[2], bottom.0[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inpaint::geometry::Rect;
    use crate::inpaint::mask::rasterize;
    use image::{GrayImage, Luma};

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8, 255])
        })
    }

    fn solid(width: u32, height: u32, color: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba(color))
    }

    #[test]
    fn preserve_pixels_are_bit_identical_and_replace_pixels_take_replacement() {
        let original = gradient(100, 100);
        let replacement = solid(100, 100, [255, 0, 0, 255]);
        let mask = rasterize(&[Rect::new(10.0, 10.0, 20.0, 20.0)], 100, 100);

        let out = Compositor::default().composite(&original, &mask, &replacement);

        for (x, y, pixel) in out.enumerate_pixels() {
            let inside = (10..30).contains(&x) && (10..30).contains(&y);
            if inside {
                assert_eq!(pixel, &Rgba([255, 0, 0, 255]), "({x},{y})");
            } else {
                assert_eq!(pixel, original.get_pixel(x, y), "({x},{y})");
            }
        }
    }

    #[test]
    fn translucent_original_pixels_survive_untouched() {
        let original = solid(4, 4, [9, 8, 7, 0]);
        let replacement = solid(4, 4, [1, 2, 3, 255]);
        let mask = rasterize(&[Rect::new(0.0, 0.0, 2.0, 2.0)], 4, 4);

        let out = Compositor::default().composite(&original, &mask, &replacement);
        assert_eq!(out.get_pixel(3, 3), &Rgba([9, 8, 7, 0]));
        assert_eq!(out.get_pixel(0, 0), &Rgba([1, 2, 3, 255]));
    }

    #[test]
    fn gray_mask_blends_linearly() {
        let original = solid(1, 1, [0, 0, 0, 255]);
        let replacement = solid(1, 1, [200, 100, 50, 255]);
        let mask = Mask::from_coverage(GrayImage::from_pixel(1, 1, Luma([128])));

        let out = Compositor::default().composite(&original, &mask, &replacement);
        assert_eq!(out.get_pixel(0, 0), &Rgba([100, 50, 25, 255]));
    }

    #[test]
    fn mismatched_replacement_is_stretched_to_original() {
        let original = gradient(50, 50);
        let replacement = solid(100, 100, [0, 0, 255, 255]);
        let mask = rasterize(&[Rect::new(0.0, 0.0, 25.0, 50.0)], 50, 50);

        let out = Compositor::default().composite(&original, &mask, &replacement);
        assert_eq!(out.dimensions(), (50, 50));
        assert_eq!(out.get_pixel(10, 10), &Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(40, 10), original.get_pixel(40, 10));
    }

    #[test]
    fn mismatched_mask_is_stretched_to_original() {
        let original = gradient(20, 20);
        let replacement = solid(20, 20, [0, 255, 0, 255]);
        let mask = rasterize(&[Rect::new(0.0, 0.0, 5.0, 10.0)], 10, 10);

        let out = Compositor::default().composite(&original, &mask, &replacement);
        assert_eq!(out.get_pixel(9, 19), &Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(10, 0), original.get_pixel(10, 0));
    }

    #[test]
    fn inputs_are_not_mutated() {
        let original = gradient(8, 8);
        let replacement = solid(8, 8, [5, 5, 5, 255]);
        let mask = rasterize(&[Rect::new(0.0, 0.0, 8.0, 8.0)], 8, 8);
        let (o, r, m) = (original.clone(), replacement.clone(), mask.clone());

        let _ = Compositor::default().composite(&original, &mask, &replacement);
        assert_eq!((original, replacement, mask), (o, r, m));
    }

    #[test]
    fn encoded_composite_round_trips_through_png() {
        let original = gradient(12, 12);
        let replacement = solid(24, 24, [255, 255, 0, 255]);
        let mask = rasterize(&[Rect::new(2.0, 2.0, 6.0, 6.0)], 12, 12);

        let bytes = Compositor::default()
            .composite_encoded(
                &codec::encode_rgba_png(&original).expect("original"),
                &mask.encode_png().expect("mask"),
                &codec::encode_rgba_png(&replacement).expect("replacement"),
            )
            .expect("composite");
        let out = codec::decode_rgba(&bytes).expect("decode output");

        assert_eq!(out.dimensions(), (12, 12));
        assert_eq!(out.get_pixel(4, 4), &Rgba([255, 255, 0, 255]));
        assert_eq!(out.get_pixel(0, 0), original.get_pixel(0, 0));
        assert_eq!(out.get_pixel(11, 11), original.get_pixel(11, 11));
    }

    #[test]
    fn undecodable_input_fails_with_its_role() {
        let original = codec::encode_rgba_png(&gradient(4, 4)).expect("original");
        let mask = rasterize(&[], 4, 4).encode_png().expect("mask");

        let err = Compositor::default()
            .composite_encoded(&original, &mask, b"<html>oops</html>")
            .expect_err("replacement is garbage");
        assert!(matches!(
            err,
            CompositeError::Decode {
                role: ImageRole::Replacement,
                ..
            }
        ));
    }
}
