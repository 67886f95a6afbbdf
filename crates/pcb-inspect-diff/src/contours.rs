//! Candidate extraction from a cleaned mask.

use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;
use pcb_inspect_core::{CandidateRegion, Rect};

/// Shoelace area of a closed polygon given by its vertices.
///
/// A contour traced through pixel centres covers `(w - 1) × (h - 1)` for a
/// solid `w × h` block; single pixels and one-pixel lines have zero area.
pub fn polygon_area(points: &[Point<u32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice.unsigned_abs() as f64 * 0.5
}

/// Tight bounding rectangle of a point set (inclusive of every point).
pub fn bounding_rect(points: &[Point<u32>]) -> Option<Rect> {
    let first = points.first()?;
    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }
    Some(Rect::new(x0, y0, x1 - x0 + 1, y1 - y0 + 1))
}

/// Outer borders that are not nested inside any hole.
///
/// The mask is traced inside a one-pixel background frame, so blobs touching
/// the image edge are still reported as outer borders. Points are returned in
/// mask coordinates.
pub fn external_contours(mask: &GrayImage) -> Vec<Contour<u32>> {
    let (w, h) = mask.dimensions();
    let mut framed = GrayImage::new(w + 2, h + 2);
    imageops::replace(&mut framed, mask, 1, 1);

    find_contours::<u32>(&framed)
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|mut c| {
            // foreground never lies on the frame, so every coordinate is >= 1
            for p in &mut c.points {
                *p = Point::new(p.x - 1, p.y - 1);
            }
            c
        })
        .collect()
}

/// Candidate regions of a binary mask.
///
/// Keeps external contours whose polygon area is strictly greater than
/// `min_area`, pads each bounding box by `padding` pixels and clamps it to
/// the mask. The result is sorted by the top-left corner of the unpadded box
/// (row first), so ordinals are stable across runs.
pub fn extract_candidates(mask: &GrayImage, min_area: f64, padding: u32) -> Vec<CandidateRegion> {
    let (w, h) = mask.dimensions();
    let mut out: Vec<CandidateRegion> = external_contours(mask)
        .iter()
        .filter_map(|contour| {
            let area = polygon_area(&contour.points);
            if area <= min_area {
                return None;
            }
            let bbox = bounding_rect(&contour.points)?;
            Some(CandidateRegion {
                bbox,
                padded: bbox.padded_within(padding, w, h),
                contour_area: area,
            })
        })
        .collect();

    out.sort_by(|a, b| {
        (a.bbox.y, a.bbox.x, a.bbox.width, a.bbox.height).cmp(&(
            b.bbox.y,
            b.bbox.x,
            b.bbox.width,
            b.bbox.height,
        ))
    });
    out
}
