use super::Executable;
use crate::shapes::point::Point;
use anyhow::Result;
use image::{RgbImage, RgbaImage};

/// Alpha composite an RGBA overlay onto the target at `at`. Overlay pixels
/// that fall outside the target are ignored.
#[derive(Debug, Clone)]
pub struct Blend {
    src: RgbaImage,
    at: Point,
    opacity_scale: f64,
}

impl Blend {
    pub fn new(src: RgbaImage, at: Point, opacity_scale: f64) -> Blend {
        Blend {
            src,
            at,
            opacity_scale,
        }
    }
}

impl Executable for Blend {
    fn execute(&self, img: &mut RgbImage) -> Result<()> {
        let (width, height) = img.dimensions();
        let (src_w, src_h) = self.src.dimensions();

        for y in self.at.y.max(0) as u32..height {
            let src_y = (y as i64 - self.at.y as i64) as u32;
            if src_y >= src_h {
                break;
            }

            for x in self.at.x.max(0) as u32..width {
                let src_x = (x as i64 - self.at.x as i64) as u32;
                if src_x >= src_w {
                    break;
                }

                let overlay = self.src.get_pixel(src_x, src_y);
                let opacity = overlay[3] as f64 / 255. * self.opacity_scale;
                if opacity <= 0. {
                    continue;
                }

                let target = img.get_pixel_mut(x, y);
                for c in 0..3 {
                    let mixed = target[c] as f64 * (1. - opacity) + overlay[c] as f64 * opacity;
                    target[c] = mixed as u8;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    fn blend(src: RgbaImage, x: i32, y: i32, img: &mut RgbImage) {
        Blend::new(src, Point::new(x, y), 1.).execute(img).unwrap();
    }

    #[test]
    fn test_transparent_is_noop() {
        let mut img = RgbImage::from_pixel(20, 20, Rgb([7, 8, 9]));
        let before = img.clone();

        blend(RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 0])), 5, 5, &mut img);
        assert_eq!(img, before);
    }

    #[test]
    fn test_opaque_overwrites() {
        let mut img = RgbImage::from_pixel(20, 20, Rgb([7, 8, 9]));

        blend(RgbaImage::from_pixel(10, 10, Rgba([200, 100, 50, 255])), 5, 5, &mut img);
        assert_eq!(*img.get_pixel(5, 5), Rgb([200, 100, 50]));
        assert_eq!(*img.get_pixel(14, 14), Rgb([200, 100, 50]));
        assert_eq!(*img.get_pixel(15, 15), Rgb([7, 8, 9]));
        assert_eq!(*img.get_pixel(4, 4), Rgb([7, 8, 9]));
    }

    #[test]
    fn test_partial_alpha_truncates() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([100, 0, 255]));

        // 51/255 = 0.2
        blend(RgbaImage::from_pixel(4, 4, Rgba([200, 255, 0, 51])), 0, 0, &mut img);
        assert_eq!(*img.get_pixel(0, 0), Rgb([120, 51, 204]));
    }

    #[test]
    fn test_opacity_scale() {
        let mut img = RgbImage::from_pixel(4, 4, Rgb([0, 0, 0]));

        Blend::new(RgbaImage::from_pixel(4, 4, Rgba([200, 200, 200, 255])), Point::new(0, 0), 0.5)
            .execute(&mut img)
            .unwrap();
        assert_eq!(*img.get_pixel(1, 1), Rgb([100, 100, 100]));
    }

    #[test]
    fn test_clipped_at_edges() {
        let paint = Rgba([1, 2, 3, 255]);
        let mut img = RgbImage::new(10, 10);
        blend(RgbaImage::from_pixel(6, 6, paint), -3, -2, &mut img);
        blend(RgbaImage::from_pixel(6, 6, paint), 7, 8, &mut img);

        let painted: Vec<(u32, u32)> = img
            .enumerate_pixels()
            .filter(|(_, _, p)| **p == Rgb([1, 2, 3]))
            .map(|(x, y, _)| (x, y))
            .collect();
        assert_eq!(painted.len(), 3 * 4 + 3 * 2);
    }

    #[test]
    fn test_fully_outside() {
        let mut img = RgbImage::new(10, 10);
        let before = img.clone();
        let paint = RgbaImage::from_pixel(6, 6, Rgba([1, 2, 3, 255]));

        blend(paint.clone(), -6, 0, &mut img);
        blend(paint.clone(), 0, -10, &mut img);
        blend(paint, 10, 10, &mut img);
        assert_eq!(img, before);
    }
}
