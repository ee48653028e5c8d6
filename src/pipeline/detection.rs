use super::cascade::{Cascade, HaarCascade, ScanParams};
use super::trace::{DetectionObserver, NoopObserver};
use super::{Detection, FaceMatch};
use crate::config::DetectorConfig;
use crate::error::Result;
use image::RgbImage;
use image::imageops::{crop_imm, grayscale};
use tracing::{Level, debug, span, trace};

/// Two level cascade: faces over the whole frame, then eyes within each
/// face.
pub struct FaceDetector<C = HaarCascade> {
    face_cascade: C,
    eye_cascade: C,
    config: DetectorConfig,
}

impl FaceDetector<HaarCascade> {
    /// Loads both cascades named in `config`. A missing or malformed cascade
    /// leaves nothing to detect with, so this fails outright.
    pub fn new(config: DetectorConfig) -> Result<Self> {
        let face_cascade = HaarCascade::load(&config.face_cascade)?;
        let eye_cascade = HaarCascade::load(&config.eye_cascade)?;

        Ok(Self::with_cascades(face_cascade, eye_cascade, config))
    }
}

impl<C: Cascade> FaceDetector<C> {
    pub fn with_cascades(face_cascade: C, eye_cascade: C, config: DetectorConfig) -> Self {
        Self {
            face_cascade,
            eye_cascade,
            config,
        }
    }

    pub fn detect(&self, img: &RgbImage) -> Detection {
        self.detect_observed(img, &mut NoopObserver)
    }

    pub fn detect_observed(
        &self,
        img: &RgbImage,
        observer: &mut dyn DetectionObserver,
    ) -> Detection {
        let span = span!(Level::DEBUG, "face_detector");
        let _guard = span.enter();

        let gray = grayscale(img);
        let face_params = ScanParams {
            scale_factor: self.config.scale_factor,
            min_neighbors: self.config.min_neighbors,
            min_size: self.config.min_face_size,
        };
        let eye_params = ScanParams {
            min_size: 0,
            ..face_params
        };

        let faces = self.face_cascade.detect_multi_scale(&gray, &face_params);
        debug!("Detected {} faces", faces.len());

        let mut detection = Detection::new();
        for (idx, face) in faces.into_iter().enumerate() {
            observer.on_face(idx, &face);

            let roi = crop_imm(&gray, face.x, face.y, face.w, face.h).to_image();
            let eyes = self.eye_cascade.detect_multi_scale(&roi, &eye_params);
            observer.on_eyes(idx, &face, &eyes);
            trace!("Face {idx} {face:?}: {} eyes", eyes.len());

            if self.config.require_eyes && eyes.is_empty() {
                debug!("Dropping face {idx}, no eyes found");
                continue;
            }

            detection.push(FaceMatch::new(face, eyes));
        }

        detection
    }
}
