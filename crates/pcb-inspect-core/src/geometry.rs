use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in pixel coordinates.
///
/// `x`/`y` is the top-left pixel; the rectangle covers
/// `[x, x + width) × [y, y + height)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a rectangle from inclusive-exclusive corner coordinates.
    ///
    /// Returns `None` when the corners are inverted.
    pub fn from_corners(x0: u32, y0: u32, x1: u32, y1: u32) -> Option<Self> {
        if x1 < x0 || y1 < y0 {
            return None;
        }
        Some(Self::new(x0, y0, x1 - x0, y1 - y0))
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    #[inline]
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// `true` when the rectangle lies fully inside a `width × height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width && self.bottom() <= height
    }

    /// Grow the rectangle by `pad` pixels on every side and clamp it to a
    /// `width × height` image.
    pub fn padded_within(&self, pad: u32, width: u32, height: u32) -> Self {
        let x0 = self.x.saturating_sub(pad);
        let y0 = self.y.saturating_sub(pad);
        let x1 = self.right().saturating_add(pad).min(width);
        let y1 = self.bottom().saturating_add(pad).min(height);
        Self::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

/// One region flagged by the template-difference pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateRegion {
    /// Bounding rectangle of the contour, before padding.
    pub bbox: Rect,
    /// Padded region clamped to the image; this is what gets cropped.
    pub padded: Rect,
    /// Polygon area of the external contour that produced the region.
    pub contour_area: f64,
}
