//! Geometry that turns raw per-instance model output into client-ready outlines.

use anyhow::{anyhow, Result};
use image::{imageops, GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use ndarray::ArrayView2;
use crate::detection_runners::image_ops::resize_nearest_u8;

/// Mask values strictly above this are foreground.
pub const MASK_THRESHOLD: f32 = 0.5;

/// Douglas-Peucker tolerance as a fraction of the contour perimeter.
pub const SIMPLIFY_RATIO: f64 = 0.002;

/// Fewest vertices an outline may have and still be reported.
pub const MIN_VERTICES: usize = 3;

/// Converts a single-instance probability mask into a flat, normalized polygon.
///
/// The mask is resampled (nearest neighbour) to `orig_shape` when its resolution differs,
/// binarized at [`MASK_THRESHOLD`], and the outer boundary of its largest connected
/// component is simplified with an epsilon of [`SIMPLIFY_RATIO`] times its perimeter.
/// Vertices are divided by the original width and height.
///
/// # Arguments
///
/// * `mask` - Foreground likelihoods, `(rows, cols)`.
/// * `orig_shape` - `(height, width)` of the original image.
///
/// # Returns
///
/// `[x0, y0, x1, y1, ...]` with every value in `[0, 1]`, or an empty vector when the mask
/// has no usable outline (empty mask, single pixels, or fewer than [`MIN_VERTICES`]
/// vertices left after simplification).
pub fn mask_to_polygon(mask: ArrayView2<f32>, orig_shape: (u32, u32)) -> Result<Vec<f32>> {
    let (height, width) = orig_shape;
    let (mask_h, mask_w) = mask.dim();
    if height == 0 || width == 0 || mask_h == 0 || mask_w == 0 {
        return Ok(Vec::new());
    }

    // Thresholding commutes with nearest-neighbour sampling, so binarize at the smaller
    // mask resolution and resample the u8 plane.
    let plane: Vec<u8> = mask
        .iter()
        .map(|&v| if v > MASK_THRESHOLD { 255 } else { 0 })
        .collect();
    if plane.iter().all(|&v| v == 0) {
        return Ok(Vec::new());
    }

    let plane = resize_nearest_u8(plane, mask_w as u32, mask_h as u32, width, height)?;
    let binary = GrayImage::from_raw(width, height, plane)
        .ok_or_else(|| anyhow!("Resampled mask does not match {}x{}", width, height))?;

    let Some(contour) = largest_outer_contour(&binary) else {
        return Ok(Vec::new());
    };
    let outline = simplify_closed(&contour);
    if outline.len() < MIN_VERTICES {
        return Ok(Vec::new());
    }

    Ok(normalize_points(&outline, width, height))
}

/// Rectangle outline for a raw pixel box `[x1, y1, x2, y2]`, for models without masks.
pub fn box_to_polygon(xyxy: [f32; 4], orig_shape: (u32, u32)) -> Vec<f32> {
    let (h, w) = (orig_shape.0 as f32, orig_shape.1 as f32);
    let [x1, y1, x2, y2] = xyxy;
    vec![
        x1 / w, y1 / h,
        x2 / w, y1 / h,
        x2 / w, y2 / h,
        x1 / w, y2 / h,
    ]
}

/// Outer boundaries only; holes and anything nested inside a hole are skipped.
///
/// The plane gets a one pixel background frame first. Without it a component touching
/// the image edge is traced as a hole of the frame rather than as an outer border.
fn largest_outer_contour(binary: &GrayImage) -> Option<Vec<Point<i32>>> {
    let mut framed = GrayImage::from_pixel(binary.width() + 2, binary.height() + 2, Luma([0]));
    imageops::replace(&mut framed, binary, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .filter(|c| c.points.len() >= MIN_VERTICES)
        .max_by(|a, b| contour_area(&a.points).total_cmp(&contour_area(&b.points)))
        .map(|c| c.points.into_iter().map(|p| Point::new(p.x - 1, p.y - 1)).collect())
}

/// Shoelace area of a closed outline.
pub(crate) fn contour_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut area = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        area += p.x as f64 * q.y as f64 - q.x as f64 * p.y as f64;
    }
    (area / 2.0).abs()
}

/// Douglas-Peucker on a closed outline.
///
/// The outline is split at the vertex farthest from its first point and both halves are
/// simplified as open polylines, so the result does not depend on where tracing started.
fn simplify_closed(points: &[Point<i32>]) -> Vec<Point<i32>> {
    let epsilon = SIMPLIFY_RATIO * arc_length(points, true);
    if points.len() < MIN_VERTICES || epsilon <= 0.0 {
        return Vec::new();
    }

    let first = points[0];
    let far = points
        .iter()
        .enumerate()
        .max_by_key(|(_, p)| {
            let (dx, dy) = ((p.x - first.x) as i64, (p.y - first.y) as i64);
            dx * dx + dy * dy
        })
        .map(|(i, _)| i)
        .unwrap_or(0);
    if far == 0 {
        return Vec::new();
    }

    let mut outline = approximate_polygon_dp(&points[..=far], epsilon, false);
    let mut back: Vec<Point<i32>> = points[far..].to_vec();
    back.push(first);
    let back = approximate_polygon_dp(&back, epsilon, false);

    // `far` starts the second half, `first` closes it
    outline.pop();
    outline.extend(back);
    outline.pop();

    outline.dedup();
    if outline.len() > 1 && outline.first() == outline.last() {
        outline.pop();
    }
    outline
}

fn normalize_points(points: &[Point<i32>], width: u32, height: u32) -> Vec<f32> {
    let (w, h) = (width as f32, height as f32);
    points
        .iter()
        .flat_map(|p| [p.x as f32 / w, p.y as f32 / h])
        .collect()
}
