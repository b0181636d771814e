use serde::{Deserialize, Serialize};

/// Axis-aligned box with a top-left origin.
///
/// The same type is used for pixel-space candidates inside the detector and for the
/// normalized `[0, 1]` boxes handed to clients; [`DentBox::normalized`] converts one
/// into the other.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize, PartialOrd)]
pub struct DentBox {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl DentBox {
    /// Returned by [`DentBox::from_polygon`] when there is nothing to measure.
    pub const FALLBACK: DentBox = DentBox { x: 0.1, y: 0.1, w: 0.2, h: 0.2 };

    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Builds a box from corner coordinates `(x1, y1, x2, y2)`.
    pub fn from_x1y1_x2y2(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x: x1, y: y1, w: x2 - x1, h: y2 - y1 }
    }

    /// Builds a box from center coordinates and size `(cx, cy, w, h)`.
    pub fn from_cxcy_wh(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self { x: cx - w / 2., y: cy - h / 2., w, h }
    }

    /// Normalizes a raw pixel box `[x1, y1, x2, y2]` by the original image size.
    ///
    /// # Arguments
    ///
    /// * `xyxy` - Absolute pixel corners.
    /// * `orig_shape` - `(height, width)` of the original image.
    pub fn from_xyxy(xyxy: [f32; 4], orig_shape: (u32, u32)) -> Self {
        let (h, w) = (orig_shape.0 as f32, orig_shape.1 as f32);
        let [x1, y1, x2, y2] = xyxy;
        Self {
            x: x1 / w,
            y: y1 / h,
            w: (x2 - x1) / w,
            h: (y2 - y1) / h,
        }
    }

    /// Tightest box around a flat `[x0, y0, x1, y1, ...]` polygon.
    ///
    /// Polygons with fewer than two vertices yield [`DentBox::FALLBACK`] instead of an error.
    pub fn from_polygon(polygon: &[f32]) -> Self {
        if polygon.len() < 4 {
            return Self::FALLBACK;
        }

        let (mut x_min, mut y_min) = (f32::MAX, f32::MAX);
        let (mut x_max, mut y_max) = (f32::MIN, f32::MIN);
        for xy in polygon.chunks_exact(2) {
            x_min = x_min.min(xy[0]);
            x_max = x_max.max(xy[0]);
            y_min = y_min.min(xy[1]);
            y_max = y_max.max(xy[1]);
        }

        Self::from_x1y1_x2y2(x_min, y_min, x_max, y_max)
    }

    /// The maximum x-coordinate of the box.
    pub fn x_max(&self) -> f32 {
        self.x + self.w
    }

    /// The maximum y-coordinate of the box.
    pub fn y_max(&self) -> f32 {
        self.y + self.h
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Returns the box corners as `[x1, y1, x2, y2]`.
    pub fn xyxy(&self) -> [f32; 4] {
        [self.x, self.y, self.x_max(), self.y_max()]
    }

    /// Clips the box to `[0, width] x [0, height]`.
    pub fn clamp(&self, width: f32, height: f32) -> Self {
        let x1 = self.x.clamp(0., width);
        let y1 = self.y.clamp(0., height);
        let x2 = self.x_max().clamp(0., width);
        let y2 = self.y_max().clamp(0., height);
        Self::from_x1y1_x2y2(x1, y1, x2, y2)
    }

    /// Computes the intersection area between this box and another.
    pub fn intersect(&self, other: &DentBox) -> f32 {
        let left = self.x.max(other.x);
        let right = self.x_max().min(other.x_max());
        let top = self.y.max(other.y);
        let bottom = self.y_max().min(other.y_max());
        (right - left).max(0.) * (bottom - top).max(0.)
    }

    /// Computes the union area between this box and another.
    pub fn union(&self, other: &DentBox) -> f32 {
        self.area() + other.area() - self.intersect(other)
    }

    pub fn iou(&self, other: &DentBox) -> f32 {
        let union = self.union(other);
        if union <= 0. {
            return 0.;
        }
        self.intersect(other) / union
    }
}
