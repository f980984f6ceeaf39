use anyhow::Result;
use image::{GrayImage, Luma, Rgb, RgbImage, RgbaImage};

use crate::inpaint::codec;
use crate::inpaint::geometry::Rect;

pub const PRESERVE: u8 = 0;
pub const REPLACE: u8 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskClass {
    Preserve,
    Replace,
    /// Neither pure class; blended with this much replacement coverage.
    Partial(u8),
}

/// Per-pixel replacement coverage at the original image's resolution.
/// `PRESERVE` keeps the original pixel, `REPLACE` takes the replacement pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    coverage: GrayImage,
}

impl Mask {
    pub fn preserve_all(width: u32, height: u32) -> Self {
        Self {
            coverage: GrayImage::from_pixel(width, height, Luma([PRESERVE])),
        }
    }

    pub fn from_coverage(coverage: GrayImage) -> Self {
        Self { coverage }
    }

    /// Reads a black/white mask image, taking the green channel as coverage.
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let coverage = GrayImage::from_fn(image.width(), image.height(), |x, y| {
            Luma([image.get_pixel(x, y).0[1]])
        });
        Self { coverage }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let image = codec::decode_rgba(bytes)?;
        Ok(Self::from_rgba(&image))
    }

    pub fn width(&self) -> u32 {
        self.coverage.width()
    }

    pub fn height(&self) -> u32 {
        self.coverage.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.coverage.dimensions()
    }

    pub fn coverage(&self, x: u32, y: u32) -> u8 {
        self.coverage.get_pixel(x, y).0[0]
    }

    pub fn class_at(&self, x: u32, y: u32) -> MaskClass {
        match self.coverage(x, y) {
            PRESERVE => MaskClass::Preserve,
            REPLACE => MaskClass::Replace,
            partial => MaskClass::Partial(partial),
        }
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.coverage
    }

    pub fn replace_pixel_count(&self) -> usize {
        self.coverage.pixels().filter(|p| p.0[0] != PRESERVE).count()
    }

    /// Stretches the mask to a new size. Nearest-neighbour keeps a binary
    /// mask binary.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self.clone();
        }
        let (src_w, src_h) = self.dimensions();
        if src_w == 0 || src_h == 0 {
            return Self::preserve_all(width, height);
        }
        let nearest = |dst: u32, dst_len: u32, src_len: u32| -> u32 {
            let scaled = (dst as u64 * 2 + 1) * src_len as u64 / (dst_len as u64 * 2);
            (scaled as u32).min(src_len - 1)
        };
        let coverage = GrayImage::from_fn(width, height, |x, y| {
            *self
                .coverage
                .get_pixel(nearest(x, width, src_w), nearest(y, height, src_h))
        });
        Self { coverage }
    }

    /// Wire form: opaque RGB, black = preserve, white = replace.
    pub fn to_rgb(&self) -> RgbImage {
        RgbImage::from_fn(self.width(), self.height(), |x, y| {
            let value = self.coverage(x, y);
            Rgb([value, value, value])
        })
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        codec::encode_rgb_png(&self.to_rgb())
    }
}

/// Builds the mask for a set of committed rectangles. Overlaps are unioned.
pub fn rasterize(rects: &[Rect], width: u32, height: u32) -> Mask {
    let mut mask = Mask::preserve_all(width, height);
    for rect in rects {
        let Some((x0, y0, x1, y1)) = rect.pixel_span(width, height) else {
            continue;
        };
        for y in y0..y1 {
            for x in x0..x1 {
                mask.coverage.put_pixel(x, y, Luma([REPLACE]));
            }
        }
    }
    tracing::debug!(
        rects = rects.len(),
        width,
        height,
        replaced = mask.replace_pixel_count(),
        "mask rasterized"
    );
    mask
}
