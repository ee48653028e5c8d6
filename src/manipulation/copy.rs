use super::Executable;
use crate::shapes::point::Point;
use crate::shapes::rect::Rect;
use anyhow::Result;
use image::imageops::crop_imm;
use image::{GenericImage, RgbImage};
use tracing::trace;

/// Paste an opaque overlay onto the target at `at`, cropped to whatever
/// part of it lands inside the target.
#[derive(Debug, Clone)]
pub struct Copy {
    src: RgbImage,
    at: Point,
}

impl Copy {
    pub fn new(src: RgbImage, at: Point) -> Copy {
        Copy { src, at }
    }

    /// Part of the overlay, in overlay coordinates, that lands on a
    /// `width` x `height` target.
    pub fn visible(&self, width: u32, height: u32) -> Option<Rect> {
        let (x, y) = (self.at.x as i64, self.at.y as i64);
        let left = (-x).max(0);
        let top = (-y).max(0);
        let right = (self.src.width() as i64).min(width as i64 - x);
        let bottom = (self.src.height() as i64).min(height as i64 - y);

        if right <= left || bottom <= top {
            return None;
        }

        Some(Rect::new(
            left as u32,
            top as u32,
            (right - left) as u32,
            (bottom - top) as u32,
        ))
    }
}

impl Executable for Copy {
    fn execute(&self, img: &mut RgbImage) -> Result<()> {
        let Some(crop) = self.visible(img.width(), img.height()) else {
            trace!("Overlay at {:?} misses the target", self.at);
            return Ok(());
        };

        let visible = crop_imm(&self.src, crop.x, crop.y, crop.w, crop.h).to_image();
        img.copy_from(&visible, self.at.x.max(0) as u32, self.at.y.max(0) as u32)?;

        Ok(())
    }
}
