use image::imageops::{self, FilterType};
use image::{ImageBuffer, Pixel};

/// Overlay size for a face `face_width` wide: the width is `scale` times the
/// face width, and the height keeps the overlay's aspect ratio. `None` when
/// either side truncates to zero.
pub fn fit_to_face((width, height): (u32, u32), face_width: u32, scale: f64) -> Option<(u32, u32)> {
    if width == 0 {
        return None;
    }

    let aspect_ratio = height as f64 / width as f64;
    let w = (face_width as f64 * scale) as u32;
    let h = (face_width as f64 * aspect_ratio * scale) as u32;

    (w > 0 && h > 0).then_some((w, h))
}

pub fn resize<P>(img: &ImageBuffer<P, Vec<u8>>, width: u32, height: u32) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + 'static,
{
    imageops::resize(img, width, height, FilterType::Triangle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn test_fit_to_face() {
        assert_eq!(fit_to_face((100, 50), 60, 1.1), Some((66, 33)));
        assert_eq!(fit_to_face((50, 100), 40, 1.0), Some((40, 80)));
    }

    #[test]
    fn test_fit_to_face_degenerate() {
        assert_eq!(fit_to_face((0, 50), 60, 1.1), None);
        assert_eq!(fit_to_face((100, 1), 10, 1.1), None);
        assert_eq!(fit_to_face((100, 50), 0, 1.1), None);
    }

    #[test]
    fn test_resize_keeps_flat_color() {
        let img = RgbImage::from_pixel(100, 50, Rgb([200, 100, 50]));
        let out = resize(&img, 66, 33);

        assert_eq!(out.dimensions(), (66, 33));
        assert!(out.pixels().all(|p| *p == Rgb([200, 100, 50])));
    }
}
