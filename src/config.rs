use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

pub const CASCADE_DIR: &str = "/usr/share/opencv/haarcascades";
pub const FACE_CASCADE: &str = "haarcascade_frontalface_default.xml";
pub const EYE_CASCADE: &str = "haarcascade_eye.xml";

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub detector: DetectorConfig,
    pub compositor: CompositorConfig,
}

#[derive(Debug, Clone)]
pub struct DetectorConfig {
    pub face_cascade: PathBuf,
    pub eye_cascade: PathBuf,
    /// Growth of the scan window between pyramid levels
    pub scale_factor: f64,
    /// Hits a grouped region needs beyond the first before it is reported
    pub min_neighbors: u32,
    /// Smallest face window considered, 0 for no limit
    pub min_face_size: u32,
    /// Drop faces with no eye detected inside them
    pub require_eyes: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::with_cascade_dir(CASCADE_DIR)
    }
}

impl DetectorConfig {
    pub fn with_cascade_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();

        Self {
            face_cascade: dir.join(FACE_CASCADE),
            eye_cascade: dir.join(EYE_CASCADE),
            scale_factor: 1.1,
            min_neighbors: 2,
            min_face_size: 0,
            require_eyes: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompositorConfig {
    /// Overlay width relative to the face width
    pub scale: f64,
    /// Fraction of the overlay width shifted left of the face
    pub offset_x: f64,
    /// Fraction of the overlay height shifted above the face
    pub offset_y: f64,
    /// Tilt (degrees) that must be exceeded before the overlay is rotated
    pub rotation_threshold: f64,
    pub rotate: bool,
    /// Multiplier on overlay alpha when blending
    pub opacity_scale: f64,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            scale: 1.1,
            offset_x: 0.15,
            offset_y: 0.15,
            rotation_threshold: 0.,
            rotate: true,
            opacity_scale: 1.,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let d = &self.detector;
        let c = &self.compositor;

        if !d.scale_factor.is_finite() || d.scale_factor <= 1. {
            return Err(Error::InvalidArgument(format!(
                "scale factor must be greater than 1, got {}",
                d.scale_factor
            )));
        }

        if !c.scale.is_finite() || c.scale <= 0. {
            return Err(Error::InvalidArgument(format!(
                "overlay scale must be positive, got {}",
                c.scale
            )));
        }

        for (name, v) in [
            ("offset-x", c.offset_x),
            ("offset-y", c.offset_y),
            ("rotation threshold", c.rotation_threshold),
        ] {
            if !v.is_finite() {
                return Err(Error::InvalidArgument(format!("{name} must be finite, got {v}")));
            }
        }

        if !(0. ..=1.).contains(&c.opacity_scale) {
            return Err(Error::InvalidArgument(format!(
                "opacity scale must be within [0, 1], got {}",
                c.opacity_scale
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cascade_paths() {
        let config = DetectorConfig::default();

        assert_eq!(
            config.face_cascade,
            PathBuf::from("/usr/share/opencv/haarcascades/haarcascade_frontalface_default.xml")
        );
        assert_eq!(
            config.eye_cascade,
            PathBuf::from("/usr/share/opencv/haarcascades/haarcascade_eye.xml")
        );
    }

    #[test]
    fn test_defaults_validate() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_values() {
        let mut config = Config::default();
        config.detector.scale_factor = 1.;
        assert!(matches!(config.validate(), Err(Error::InvalidArgument(_))));

        let mut config = Config::default();
        config.compositor.scale = 0.;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.compositor.offset_y = f64::NAN;
        assert!(config.validate().is_err());
    }
}
