//! Histogram thresholding.

use image::GrayImage;

/// Otsu threshold of an 8-bit image.
///
/// Pixels strictly above the returned level belong to the foreground class.
pub fn otsu_level(img: &GrayImage) -> u8 {
    let mut hist = [0u64; 256];
    for &v in img.as_raw() {
        hist[v as usize] += 1;
    }
    otsu_level_from_histogram(&hist)
}

/// Otsu threshold from a 256-bin histogram.
///
/// Degenerate inputs are resolved without a variance search: an empty
/// histogram yields 127, a single occupied bin yields that bin, and two
/// occupied bins yield their midpoint. Otherwise the lowest level with the
/// largest between-class variance wins.
pub fn otsu_level_from_histogram(hist: &[u64; 256]) -> u8 {
    let Some(lo) = hist.iter().position(|&h| h > 0) else {
        return 127;
    };
    let hi = hist.iter().rposition(|&h| h > 0).unwrap_or(lo);
    if lo == hi {
        return lo as u8;
    }
    if hist.iter().filter(|&&h| h > 0).count() == 2 {
        return ((lo + hi) / 2) as u8;
    }

    let total: u64 = hist.iter().sum();
    let sum_total: u64 = hist.iter().enumerate().map(|(v, &h)| v as u64 * h).sum();

    let (mut w_b, mut sum_b) = (0u64, 0u64);
    let (mut best_t, mut best_var) = (lo, f64::NEG_INFINITY);
    // both classes are non-empty for every split in lo..hi
    for (t, &h) in hist.iter().enumerate().take(hi).skip(lo) {
        w_b += h;
        sum_b += t as u64 * h;
        let w_f = total - w_b;
        let sum_f = sum_total - sum_b;

        // w_b * w_f * (m_b - m_f)^2 with the means expanded
        let spread = w_f as f64 * sum_b as f64 - w_b as f64 * sum_f as f64;
        let var = spread * spread / (w_b as f64 * w_f as f64);
        if var > best_var {
            best_var = var;
            best_t = t;
        }
    }
    best_t as u8
}
