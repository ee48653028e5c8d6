use crate::shapes::rect::Rect;
use image::{Rgb, RgbImage};
use imageproc::drawing;

/// Hooks into a detection pass, for diagnostics.
pub trait DetectionObserver {
    fn on_face(&mut self, _index: usize, _face: &Rect) {}

    /// Every eye hit inside a face, before selection, relative to the face.
    fn on_eyes(&mut self, _face_index: usize, _face: &Rect, _eyes: &[Rect]) {}
}

pub struct NoopObserver;

impl DetectionObserver for NoopObserver {}

/// Collects detection boxes so they can be drawn onto the source image.
#[derive(Debug, Default)]
pub struct Annotator {
    boxes: Vec<(Rect, Rgb<u8>)>,
}

impl Annotator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxes(&self) -> &[(Rect, Rgb<u8>)] {
        &self.boxes
    }

    pub fn draw(&self, img: &mut RgbImage) {
        for (bounds, color) in &self.boxes {
            // 2px stroke, clipped by imageproc
            for inset in 0..2 {
                let r = Rect::new(
                    bounds.x + inset,
                    bounds.y + inset,
                    bounds.w.saturating_sub(2 * inset),
                    bounds.h.saturating_sub(2 * inset),
                );

                if !r.is_empty() {
                    drawing::draw_hollow_rect_mut(img, r.into(), *color);
                }
            }
        }
    }
}

impl DetectionObserver for Annotator {
    fn on_face(&mut self, index: usize, face: &Rect) {
        let shade = (index * 5 % 255) as u8;
        self.boxes.push((*face, Rgb([255, shade, 0])));
    }

    fn on_eyes(&mut self, _face_index: usize, face: &Rect, eyes: &[Rect]) {
        for (j, eye) in eyes.iter().enumerate() {
            let shade = (j * 5 % 255) as u8;
            self.boxes.push((eye.offset_by(face), Rgb([0, shade, 255])));
        }
    }
}
