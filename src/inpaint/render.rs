use image::{Rgba, RgbaImage};

use crate::inpaint::geometry::Rect;
use crate::inpaint::selection::SelectionModel;

const COMMITTED_FILL: Rgba<u8> = Rgba([255, 48, 48, 96]);
const COMMITTED_OUTLINE: Rgba<u8> = Rgba([255, 48, 48, 255]);
const ACTIVE_OUTLINE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Renders the selection overlay shown on top of the canvas from the selection
/// alone.
pub fn render_selection_overlay(selection: &SelectionModel, width: u32, height: u32) -> RgbaImage {
    let mut overlay = RgbaImage::new(width, height);
    for rect in selection.rects() {
        fill_rect(&mut overlay, rect, COMMITTED_FILL);
        outline_rect(&mut overlay, rect, COMMITTED_OUTLINE);
    }
    if let Some(active) = selection.in_progress() {
        outline_rect(&mut overlay, &active, ACTIVE_OUTLINE);
    }
    overlay
}

fn fill_rect(pixels: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    let Some((x0, y0, x1, y1)) = rect.pixel_span(pixels.width(), pixels.height()) else {
        return;
    };
    for y in y0..y1 {
        for x in x0..x1 {
            pixels.put_pixel(x, y, color);
        }
    }
}

fn outline_rect(pixels: &mut RgbaImage, rect: &Rect, color: Rgba<u8>) {
    let (width, height) = pixels.dimensions();
    let Some((x0, y0, x1, y1)) = rect.pixel_span(width, height) else {
        return;
    };
    // Edges clipped by the image border are not drawn.
    let edge = |v: f64| (v - 0.5).ceil() as i64;
    let top = edge(rect.y) == y0 as i64;
    let bottom = edge(rect.y + rect.height) == y1 as i64;
    let left = edge(rect.x) == x0 as i64;
    let right = edge(rect.x + rect.width) == x1 as i64;

    for x in x0..x1 {
        if top {
            pixels.put_pixel(x, y0, color);
        }
        if bottom {
            pixels.put_pixel(x, y1 - 1, color);
        }
    }
    for y in y0..y1 {
        if left {
            pixels.put_pixel(x0, y, color);
        }
        if right {
            pixels.put_pixel(x1 - 1, y, color);
        }
    }
}
