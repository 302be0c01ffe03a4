use image::{imageops, imageops::FilterType, Rgb, RgbImage};

/// Scales `image` to fit inside `width`×`height` preserving aspect ratio and
/// centers it on a black canvas. An image already at the target size is
/// returned unchanged.
pub fn letterbox(image: RgbImage, width: u32, height: u32) -> RgbImage {
    let (src_w, src_h) = image.dimensions();
    if (src_w, src_h) == (width, height) {
        return image;
    }
    if src_w == 0 || src_h == 0 {
        return RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    }

    let scale = f64::min(width as f64 / src_w as f64, height as f64 / src_h as f64);
    let new_w = ((src_w as f64 * scale) as u32).clamp(1, width);
    let new_h = ((src_h as f64 * scale) as u32).clamp(1, height);

    // Triangle is the closest match to area averaging when shrinking webcam frames.
    let resized = imageops::resize(&image, new_w, new_h, FilterType::Triangle);

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let x_offset = (width - new_w) / 2;
    let y_offset = (height - new_h) / 2;
    imageops::replace(&mut canvas, &resized, x_offset as i64, y_offset as i64);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_size_passes_through() {
        let mut image = RgbImage::new(640, 480);
        image.put_pixel(3, 4, Rgb([9, 8, 7]));
        let out = letterbox(image.clone(), 640, 480);
        assert_eq!(out, image);
    }

    #[test]
    fn portrait_frame_is_pillarboxed() {
        let image = RgbImage::from_pixel(240, 480, Rgb([255, 255, 255]));
        let out = letterbox(image, 640, 480);
        assert_eq!(out.dimensions(), (640, 480));
        // Left border stays black, the center carries the image.
        assert_eq!(out.get_pixel(10, 240), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(320, 240), &Rgb([255, 255, 255]));
    }

    #[test]
    fn wide_frame_is_letterboxed() {
        let image = RgbImage::from_pixel(1280, 480, Rgb([200, 200, 200]));
        let out = letterbox(image, 640, 480);
        assert_eq!(out.dimensions(), (640, 480));
        assert_eq!(out.get_pixel(320, 5), &Rgb([0, 0, 0]));
        assert_eq!(out.get_pixel(320, 240), &Rgb([200, 200, 200]));
    }
}
