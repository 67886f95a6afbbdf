use image::{GrayImage, RgbImage};

// BT.601 luma weights in Q14 fixed point; they sum to 1 << 14.
const W_R: u32 = 4899;
const W_G: u32 = 9617;
const W_B: u32 = 1868;
const Q_SHIFT: u32 = 14;
const Q_HALF: u32 = 1 << (Q_SHIFT - 1);

/// Convert an RGB image to 8-bit intensity with ITU-R BT.601 weights.
///
/// `image::imageops::grayscale` uses Rec. 709 weights, which shift the
/// difference values the diff thresholds are tuned against.
pub fn gray_bt601(img: &RgbImage) -> GrayImage {
    let (w, h) = img.dimensions();
    let data = img
        .as_raw()
        .chunks_exact(3)
        .map(|px| {
            let y = W_R * px[0] as u32 + W_G * px[1] as u32 + W_B * px[2] as u32;
            ((y + Q_HALF) >> Q_SHIFT) as u8
        })
        .collect();
    // Length is w * h by construction.
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| GrayImage::new(w, h))
}
