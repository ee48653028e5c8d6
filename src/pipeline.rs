use crate::config::Config;
use crate::error;
use crate::manipulation::{Compositor, Overlay};
use crate::shapes::rect::Rect;
use anyhow::Result;
use image::RgbImage;
use tracing::{Level, debug, info, span};

pub use cascade::{Cascade, HaarCascade, ScanParams, group_rectangles};
pub use detection::FaceDetector;
pub use geometry::estimate_tilt;
pub use selection::select_largest_two;
pub use trace::{Annotator, DetectionObserver, NoopObserver};

mod cascade;
mod detection;
mod geometry;
mod selection;
mod trace;

/// A detected face and the eye regions found inside it.
///
/// Eyes are relative to the face's top-left corner, and there are never
/// more than two of them.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceMatch {
    pub face: Rect,
    pub eyes: Vec<Rect>,
}

impl FaceMatch {
    /// Extra eye hits beyond two are narrowed to the tallest pair.
    pub fn new(face: Rect, eyes: Vec<Rect>) -> FaceMatch {
        FaceMatch {
            face,
            eyes: select_largest_two(eyes),
        }
    }

    /// Head tilt in degrees, only known when exactly two eyes were found.
    pub fn tilt(&self) -> Option<f64> {
        match self.eyes.as_slice() {
            [a, b] => Some(estimate_tilt(a, b)),
            _ => None,
        }
    }

    pub fn eyes_in_image(&self) -> impl Iterator<Item = Rect> + '_ {
        self.eyes.iter().map(|eye| eye.offset_by(&self.face))
    }
}

pub type Detection = Vec<FaceMatch>;

pub struct Pipeline<C = HaarCascade> {
    detector: FaceDetector<C>,
    compositor: Compositor,
}

impl Pipeline {
    pub fn new(config: &Config) -> error::Result<Pipeline> {
        config.validate()?;

        Ok(Pipeline {
            detector: FaceDetector::new(config.detector.clone())?,
            compositor: Compositor::new(config.compositor.clone()),
        })
    }
}

impl<C: Cascade> Pipeline<C> {
    pub fn from_parts(detector: FaceDetector<C>, compositor: Compositor) -> Self {
        Self {
            detector,
            compositor,
        }
    }

    /// Detect faces in `img` and paste `overlay` over each one, in place.
    pub fn run(&self, img: &mut RgbImage, overlay: &Overlay) -> Result<Detection> {
        let span = span!(Level::DEBUG, "pipeline");
        let _guard = span.enter();

        let detection = self.detector.detect(img);
        self.finish(img, overlay, detection)
    }

    /// Like `run`, but first outlines every face and raw eye hit on `img`.
    pub fn run_trace(&self, img: &mut RgbImage, overlay: &Overlay) -> Result<Detection> {
        let span = span!(Level::DEBUG, "pipeline_trace");
        let _guard = span.enter();

        let mut annotator = Annotator::new();
        let detection = self.detector.detect_observed(img, &mut annotator);
        annotator.draw(img);

        for face in &detection {
            let eyes: Vec<Rect> = face.eyes_in_image().collect();
            debug!("{:?} eyes={eyes:?} tilt={:?}", face.face, face.tilt());
        }

        self.finish(img, overlay, detection)
    }

    fn finish(
        &self,
        img: &mut RgbImage,
        overlay: &Overlay,
        detection: Detection,
    ) -> Result<Detection> {
        if detection.is_empty() {
            info!("No faces found");
        }

        self.compositor.place_all(img, overlay, &detection)?;
        Ok(detection)
    }
}
