use crate::model::Rect;
use image::RgbaImage;

/// Copy all of `src` into `canvas` with its top-left corner at (dx, dy).
/// Pixels that would land outside `canvas` are dropped.
pub fn blit_rgba(src: &RgbaImage, canvas: &mut RgbaImage, dx: u32, dy: u32) {
    let (cw, ch) = canvas.dimensions();
    let (sw, sh) = src.dimensions();
    for yy in 0..sh {
        if dy + yy >= ch {
            break;
        }
        for xx in 0..sw {
            if dx + xx >= cw {
                break;
            }
            canvas.put_pixel(dx + xx, dy + yy, *src.get_pixel(xx, yy));
        }
    }
}

/// Copy the sub-rectangle `rect` of `src` into a new buffer.
/// Returns `None` when the rectangle is empty or not fully inside `src`.
pub fn crop_rgba(src: &RgbaImage, rect: &Rect) -> Option<RgbaImage> {
    let (w, h) = src.dimensions();
    if rect.is_empty() || !Rect::new(0, 0, w, h).contains(rect) {
        return None;
    }
    let mut out = RgbaImage::new(rect.w, rect.h);
    for yy in 0..rect.h {
        for xx in 0..rect.w {
            out.put_pixel(xx, yy, *src.get_pixel(rect.x + xx, rect.y + yy));
        }
    }
    Some(out)
}

/// Return a `max(width, height)` square copy of `raster`.
///
/// The original content stays at the origin, so rectangles computed before squaring remain valid.
/// The added area is fully transparent. A raster that is already square is returned as a copy.
pub fn square_canvas(raster: &RgbaImage) -> RgbaImage {
    let (w, h) = raster.dimensions();
    if w == h {
        return raster.clone();
    }
    let side = w.max(h);
    let mut out = RgbaImage::new(side, side);
    blit_rgba(raster, &mut out, 0, 0);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn crop_rejects_out_of_bounds() {
        let img = RgbaImage::new(4, 4);
        assert!(crop_rgba(&img, &Rect::new(2, 2, 3, 1)).is_none());
        assert!(crop_rgba(&img, &Rect::new(0, 0, 0, 1)).is_none());
        assert!(crop_rgba(&img, &Rect::new(1, 1, 3, 3)).is_some());
    }

    #[test]
    fn crop_copies_pixels() {
        let mut img = RgbaImage::new(4, 4);
        img.put_pixel(2, 3, Rgba([1, 2, 3, 4]));
        let out = crop_rgba(&img, &Rect::new(1, 2, 2, 2)).expect("crop");
        assert_eq!(out.dimensions(), (2, 2));
        assert_eq!(*out.get_pixel(1, 1), Rgba([1, 2, 3, 4]));
    }
}
