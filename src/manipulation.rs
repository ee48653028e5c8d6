use crate::config::CompositorConfig;
use crate::pipeline::{Detection, FaceMatch};
use crate::shapes::point::Point;
use crate::shapes::rect::Rect;
use anyhow::Result;
pub use blend::Blend;
pub use copy::Copy;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use tracing::{Level, debug, span, trace};

mod blend;
mod copy;
mod rotate;
mod scale;

/// Image pasted over each face. Overlays with an alpha channel are blended,
/// anything else replaces the target pixels outright.
#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    Opaque(RgbImage),
    Alpha(RgbaImage),
}

impl From<DynamicImage> for Overlay {
    fn from(img: DynamicImage) -> Overlay {
        if img.color().has_alpha() {
            Overlay::Alpha(img.into_rgba8())
        } else {
            Overlay::Opaque(img.into_rgb8())
        }
    }
}

impl Overlay {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Overlay::Opaque(img) => img.dimensions(),
            Overlay::Alpha(img) => img.dimensions(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, Overlay::Alpha(_))
    }

    pub fn resized(&self, width: u32, height: u32) -> Overlay {
        match self {
            Overlay::Opaque(img) => Overlay::Opaque(scale::resize(img, width, height)),
            Overlay::Alpha(img) => Overlay::Alpha(scale::resize(img, width, height)),
        }
    }

    /// Rotate counter-clockwise by `degrees` onto a canvas grown to fit.
    /// Exposed corners are black, or transparent when there is alpha.
    pub fn rotated(&self, degrees: f64) -> Overlay {
        match self {
            Overlay::Opaque(img) => {
                Overlay::Opaque(rotate::rotate_expanded(img, degrees, Rgb([0; 3])))
            }
            Overlay::Alpha(img) => {
                Overlay::Alpha(rotate::rotate_expanded(img, degrees, Rgba([0; 4])))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub enum Operation {
    Blend(Blend),
    Copy(Copy),
}

impl From<Blend> for Operation {
    fn from(o: Blend) -> Operation {
        Operation::Blend(o)
    }
}

impl From<Copy> for Operation {
    fn from(c: Copy) -> Operation {
        Operation::Copy(c)
    }
}

trait Executable {
    fn execute(&self, img: &mut RgbImage) -> Result<()>;
}

impl Operation {
    pub fn execute(&self, img: &mut RgbImage) -> Result<()> {
        match self {
            Operation::Blend(o) => o.execute(img),
            Operation::Copy(c) => c.execute(img),
        }
    }
}

/// Sizes, tilts and places an overlay relative to each detected face.
#[derive(Debug, Clone)]
pub struct Compositor {
    config: CompositorConfig,
}

impl Compositor {
    pub fn new(config: CompositorConfig) -> Compositor {
        Compositor { config }
    }

    pub fn place_all(
        &self,
        img: &mut RgbImage,
        overlay: &Overlay,
        detection: &Detection,
    ) -> Result<()> {
        for face in detection {
            self.place(img, overlay, face)?;
        }

        Ok(())
    }

    /// Composite `overlay` over one face of `img`. The overlay itself is
    /// never modified; a scaled copy is what gets pasted.
    pub fn place(&self, img: &mut RgbImage, overlay: &Overlay, face: &FaceMatch) -> Result<()> {
        let span = span!(Level::DEBUG, "place");
        let _guard = span.enter();

        let fitted = scale::fit_to_face(overlay.dimensions(), face.face.w, self.config.scale);
        let Some((width, height)) = fitted else {
            debug!("Overlay collapses to nothing over {:?}, skipping", face.face);
            return Ok(());
        };

        let mut working = overlay.resized(width, height);
        if let Some(tilt) = self.tilt(face) {
            trace!("Rotating overlay by {tilt:.2}°");
            working = working.rotated(tilt);
        }

        let at = self.origin(&face.face, working.dimensions());
        trace!("Placing {:?} overlay at {at:?}", working.dimensions());

        self.operation(working, at).execute(img)
    }

    /// Tilt to apply for `face`, if rotation is on and the tilt clears the
    /// threshold.
    pub fn tilt(&self, face: &FaceMatch) -> Option<f64> {
        if !self.config.rotate {
            return None;
        }

        face.tilt()
            .filter(|tilt| tilt.abs() > self.config.rotation_threshold)
    }

    /// Top-left corner for an overlay of the given size, shifted up and left of the
    /// face by the configured fractions of the overlay size.
    pub fn origin(&self, face: &Rect, (width, height): (u32, u32)) -> Point {
        let x = face.x as f64 - width as f64 * self.config.offset_x;
        let y = face.y as f64 - height as f64 * self.config.offset_y;

        Point::new(x as i32, y as i32)
    }

    fn operation(&self, working: Overlay, at: Point) -> Operation {
        match working {
            Overlay::Alpha(src) => Blend::new(src, at, self.config.opacity_scale).into(),
            Overlay::Opaque(src) => Copy::new(src, at).into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(eyes: Vec<Rect>) -> FaceMatch {
        FaceMatch::new(Rect::new(50, 50, 60, 60), eyes)
    }

    fn tilted_eyes() -> Vec<Rect> {
        vec![Rect::new(10, 20, 12, 12), Rect::new(40, 22, 12, 12)]
    }

    #[test]
    fn test_overlay_from_dynamic_image() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::new(4, 3));
        let rgba = DynamicImage::ImageRgba8(RgbaImage::new(4, 3));
        let luma = DynamicImage::ImageLuma8(image::GrayImage::new(4, 3));

        assert!(!Overlay::from(rgb).has_alpha());
        assert!(Overlay::from(rgba).has_alpha());
        assert_eq!(Overlay::from(luma).dimensions(), (4, 3));
    }

    #[test]
    fn test_origin() {
        let compositor = Compositor::new(CompositorConfig::default());

        assert_eq!(compositor.origin(&Rect::new(50, 50, 60, 60), (66, 33)), Point::new(40, 45));
        assert_eq!(compositor.origin(&Rect::new(0, 2, 60, 60), (66, 33)), Point::new(-9, -2));
    }

    #[test]
    fn test_tilt_respects_config() {
        let compositor = Compositor::new(CompositorConfig::default());
        let tilt = compositor.tilt(&face(tilted_eyes())).unwrap();
        assert!((tilt - -3.814).abs() < 1e-3);

        assert_eq!(compositor.tilt(&face(vec![Rect::new(10, 20, 12, 12)])), None);

        let off = Compositor::new(CompositorConfig {
            rotate: false,
            ..CompositorConfig::default()
        });
        assert_eq!(off.tilt(&face(tilted_eyes())), None);

        let lenient = Compositor::new(CompositorConfig {
            rotation_threshold: 5.,
            ..CompositorConfig::default()
        });
        assert_eq!(lenient.tilt(&face(tilted_eyes())), None);
    }

    #[test]
    fn test_level_eyes_not_rotated() {
        let compositor = Compositor::new(CompositorConfig::default());
        let level = vec![Rect::new(10, 20, 12, 12), Rect::new(40, 20, 12, 12)];

        assert_eq!(compositor.tilt(&face(level)), None);
    }

    #[test]
    fn test_rotated_overlay_covers_more() {
        let compositor = Compositor::new(CompositorConfig::default());
        let overlay = Overlay::Alpha(RgbaImage::from_pixel(100, 50, Rgba([0, 255, 0, 255])));

        let mut level = RgbImage::new(200, 200);
        compositor.place(&mut level, &overlay, &face(vec![])).unwrap();
        let mut tilted = RgbImage::new(200, 200);
        compositor.place(&mut tilted, &overlay, &face(tilted_eyes())).unwrap();

        let painted = |img: &RgbImage| img.pixels().filter(|p| p[1] > 0).count();
        assert_eq!(painted(&level), 66 * 33);
        assert_ne!(level, tilted);
        // Exposed corners of the rotated canvas are transparent
        assert_eq!(*tilted.get_pixel(39, 44), Rgb([0, 0, 0]));
    }

    #[test]
    fn test_overlay_unchanged() {
        let compositor = Compositor::new(CompositorConfig::default());
        let overlay = Overlay::Opaque(RgbImage::from_pixel(100, 50, Rgb([9, 9, 9])));
        let before = overlay.clone();

        let mut img = RgbImage::new(200, 200);
        compositor.place(&mut img, &overlay, &face(tilted_eyes())).unwrap();
        assert_eq!(overlay, before);
    }

    #[test]
    fn test_degenerate_overlay_skipped() {
        let compositor = Compositor::new(CompositorConfig::default());
        let overlay = Overlay::Opaque(RgbImage::from_pixel(100, 1, Rgb([9, 9, 9])));
        let mut img = RgbImage::new(200, 200);

        // 1px tall overlay over a 10px face scales to zero height
        let tiny = FaceMatch::new(Rect::new(50, 50, 10, 10), vec![]);
        compositor.place(&mut img, &overlay, &tiny).unwrap();
        assert!(img.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }
}
