use crate::shapes::rect::Rect;
use image::GrayImage;

mod grouping;
mod haar;

pub use grouping::group_rectangles;
pub use haar::HaarCascade;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScanParams {
    pub scale_factor: f64,
    pub min_neighbors: u32,
    /// Smallest window (either side) to report, 0 for no limit
    pub min_size: u32,
}

/// A pretrained detector that reports candidate regions for one object
/// class. Regions are in the coordinate space of `gray`, in scan order.
pub trait Cascade {
    fn detect_multi_scale(&self, gray: &GrayImage, params: &ScanParams) -> Vec<Rect>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned results, one per call, recording the size of each
    /// image it was shown.
    pub(crate) struct Scripted {
        results: RefCell<VecDeque<Vec<Rect>>>,
        pub(crate) seen: RefCell<Vec<(u32, u32)>>,
    }

    impl Scripted {
        pub(crate) fn new(results: Vec<Vec<Rect>>) -> Self {
            Self {
                results: RefCell::new(results.into()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl Cascade for Scripted {
        fn detect_multi_scale(&self, gray: &GrayImage, _params: &ScanParams) -> Vec<Rect> {
            self.seen.borrow_mut().push(gray.dimensions());
            self.results.borrow_mut().pop_front().unwrap_or_default()
        }
    }
}
