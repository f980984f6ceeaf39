/// A position in display (CSS) pixels, as reported by pointer events.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayPoint {
    pub x: f64,
    pub y: f64,
}

impl DisplayPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A position in the image's native pixel grid.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ImagePoint {
    pub x: f64,
    pub y: f64,
}

impl ImagePoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// On-screen bounding box of the rendered canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DisplayBounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Axis-aligned rectangle in image-pixel space. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn anchored_at(point: ImagePoint) -> Self {
        Self::new(point.x, point.y, 0.0, 0.0)
    }

    pub fn from_corners(a: ImagePoint, b: ImagePoint) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
        }
    }

    pub fn exceeds(&self, min_size: f64) -> bool {
        self.width > min_size && self.height > min_size
    }

    /// Integer pixel span `(x0, y0, x1, y1)` (exclusive end) whose pixel centres
    /// fall inside the rectangle, clipped to a `width` x `height` grid.
    pub fn pixel_span(&self, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
        let first = |start: f64| (start - 0.5).ceil().max(0.0);
        let end = |stop: f64, limit: u32| (stop - 0.5).ceil().clamp(0.0, limit as f64);

        let x0 = first(self.x);
        let y0 = first(self.y);
        let x1 = end(self.x + self.width, width);
        let y1 = end(self.y + self.height, height);
        if !(x0 < x1 && y0 < y1) {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }
}

/// Maps pointer coordinates to native image pixels for the canvas's current
/// on-screen size. Build a fresh mapping whenever the display bounds change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    bounds: DisplayBounds,
    native_width: u32,
    native_height: u32,
}

impl CoordinateMapper {
    pub fn new(bounds: DisplayBounds, native_width: u32, native_height: u32) -> Self {
        Self {
            bounds,
            native_width,
            native_height,
        }
    }

    pub fn set_display_bounds(&mut self, bounds: DisplayBounds) {
        self.bounds = bounds;
    }

    pub fn display_bounds(&self) -> DisplayBounds {
        self.bounds
    }

    pub fn native_size(&self) -> (u32, u32) {
        (self.native_width, self.native_height)
    }

    /// No clamping is applied; points outside the canvas map outside the image.
    /// Returns `None` while the canvas has no visible area.
    pub fn to_image_space(&self, point: DisplayPoint) -> Option<ImagePoint> {
        if self.bounds.width <= 0.0 || self.bounds.height <= 0.0 {
            return None;
        }
        let scale_x = self.native_width as f64 / self.bounds.width;
        let scale_y = self.native_height as f64 / self.bounds.height;
        Some(ImagePoint {
            x: (point.x - self.bounds.x) * scale_x,
            y: (point.y - self.bounds.y) * scale_y,
        })
    }
}
