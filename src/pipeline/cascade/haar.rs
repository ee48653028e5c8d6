use super::grouping::group_rectangles;
use super::{Cascade, ScanParams};
use crate::error::{CascadeError, Error, Result};
use crate::shapes::rect::Rect;
use image::imageops::{FilterType, resize};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use roxmltree::{Document, Node};
use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;
use tracing::{Level, debug, span, trace};

// Tolerance applied to stage thresholds, as the trainer does
const THRESHOLD_EPS: f64 = 1e-5;
const GROUP_EPS: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
struct WeightedRect {
    rect: Rect,
    weight: f64,
}

#[derive(Debug, Clone)]
struct Feature {
    rects: Vec<WeightedRect>,
}

#[derive(Debug, Clone, Copy)]
struct TreeNode {
    // <= 0: index of a leaf, negated. > 0: index of the next node.
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Debug, Clone)]
struct WeakClassifier {
    nodes: Vec<TreeNode>,
    leaves: Vec<f64>,
}

#[derive(Debug, Clone)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

/// Boosted Haar feature cascade read from an OpenCV cascade document.
#[derive(Debug, Clone)]
pub struct HaarCascade {
    width: u32,
    height: u32,
    stages: Vec<Stage>,
    features: Vec<Feature>,
}

enum Verdict {
    Accept,
    Reject { stage: usize },
}

struct Integral {
    sum: ImageBuffer<Luma<u64>, Vec<u64>>,
    sqsum: ImageBuffer<Luma<u64>, Vec<u64>>,
}

impl Integral {
    fn new(img: &GrayImage) -> Integral {
        Integral {
            sum: integral_image::<_, u64>(img),
            sqsum: integral_squared_image::<_, u64>(img),
        }
    }

    fn sum(&self, r: &Rect) -> f64 {
        Self::rect_sum(&self.sum, r)
    }

    fn sqsum(&self, r: &Rect) -> f64 {
        Self::rect_sum(&self.sqsum, r)
    }

    fn rect_sum(ii: &ImageBuffer<Luma<u64>, Vec<u64>>, r: &Rect) -> f64 {
        let stride = ii.width() as usize;
        let raw = ii.as_raw();
        let at = |x: u32, y: u32| raw[y as usize * stride + x as usize];

        let total = at(r.right(), r.bottom()) + at(r.left(), r.top());
        let excess = at(r.right(), r.top()) + at(r.left(), r.bottom());
        (total - excess) as f64
    }
}

impl Feature {
    fn value(&self, ii: &Integral, origin: &Rect) -> f64 {
        self.rects
            .iter()
            .map(|wr| wr.weight * ii.sum(&wr.rect.offset_by(origin)))
            .sum()
    }
}

impl WeakClassifier {
    fn evaluate(&self, feature_value: impl Fn(usize) -> f64) -> f64 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            let next = if feature_value(node.feature) < node.threshold {
                node.left
            } else {
                node.right
            };

            if next <= 0 {
                return self.leaves[next.unsigned_abs() as usize];
            }
            idx = next as usize;
        }
    }
}

impl HaarCascade {
    pub fn load(path: impl AsRef<Path>) -> Result<HaarCascade> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })?;

        let cascade = Self::parse(&xml).map_err(|source| Error::Cascade {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Loaded {path:?}: {}x{} window, {} stages, {} features",
            cascade.width,
            cascade.height,
            cascade.stages.len(),
            cascade.features.len()
        );

        Ok(cascade)
    }

    pub fn parse(xml: &str) -> std::result::Result<HaarCascade, CascadeError> {
        let doc = Document::parse(xml)?;
        let root = doc.root_element();

        let cascade = match child(root, "cascade") {
            Ok(c) => c,
            Err(e) => {
                let legacy = elements(root)
                    .any(|n| n.attribute("type_id") == Some("opencv-haar-classifier"));
                if legacy {
                    return Err(CascadeError::Unsupported(
                        "pre-2.4 haar classifier layout".to_string(),
                    ));
                }
                return Err(e);
            }
        };

        let stage_type = text(cascade, "stageType")?;
        if stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!("stage type {stage_type}")));
        }

        let feature_type = text(cascade, "featureType")?;
        if feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!("feature type {feature_type}")));
        }

        let width: u32 = value(cascade, "width")?;
        let height: u32 = value(cascade, "height")?;
        if width < 3 || height < 3 {
            return Err(CascadeError::Inconsistent(format!(
                "window {width}x{height} is too small"
            )));
        }

        let stages = elements(child(cascade, "stages")?)
            .map(parse_stage)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let features = elements(child(cascade, "features")?)
            .map(parse_feature)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let cascade = HaarCascade {
            width,
            height,
            stages,
            features,
        };
        cascade.check()?;

        Ok(cascade)
    }

    pub fn window(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    // Tree branches only point forward and every index resolves, so
    // evaluation can index without checks and always terminates.
    fn check(&self) -> std::result::Result<(), CascadeError> {
        if self.stages.is_empty() {
            return Err(CascadeError::Inconsistent("no stages".to_string()));
        }

        for (f, feature) in self.features.iter().enumerate() {
            for wr in &feature.rects {
                if wr.rect.right() > self.width || wr.rect.bottom() > self.height {
                    return Err(CascadeError::Inconsistent(format!(
                        "feature {f} extends outside the {}x{} window",
                        self.width, self.height
                    )));
                }
            }
        }

        for (s, stage) in self.stages.iter().enumerate() {
            for classifier in &stage.classifiers {
                for (n, node) in classifier.nodes.iter().enumerate() {
                    if node.feature >= self.features.len() {
                        return Err(CascadeError::Inconsistent(format!(
                            "stage {s} references missing feature {}",
                            node.feature
                        )));
                    }

                    for next in [node.left, node.right] {
                        let resolves = if next <= 0 {
                            (next.unsigned_abs() as usize) < classifier.leaves.len()
                        } else {
                            (next as usize) > n && (next as usize) < classifier.nodes.len()
                        };

                        if !resolves {
                            return Err(CascadeError::Inconsistent(format!(
                                "stage {s} has a dangling tree branch {next}"
                            )));
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn evaluate(&self, ii: &Integral, x: u32, y: u32) -> Verdict {
        let window = Rect::new(x, y, self.width, self.height);
        let norm = Self::norm_factor(ii, &Rect::new(x + 1, y + 1, self.width - 2, self.height - 2));

        for (idx, stage) in self.stages.iter().enumerate() {
            let sum: f64 = stage
                .classifiers
                .iter()
                .map(|c| c.evaluate(|f| self.features[f].value(ii, &window) / norm))
                .sum();

            if sum < stage.threshold {
                return Verdict::Reject { stage: idx };
            }
        }

        Verdict::Accept
    }

    // Standard deviation of the window scaled by its area, so features are
    // compared independent of lighting.
    fn norm_factor(ii: &Integral, r: &Rect) -> f64 {
        let sum = ii.sum(r);
        let nf = r.area() as f64 * ii.sqsum(r) - sum * sum;

        if nf > 0. { nf.sqrt() } else { 1. }
    }

    fn raw_hits(&self, gray: &GrayImage, params: &ScanParams) -> Vec<Rect> {
        let mut hits = Vec::new();
        let mut factor = 1.;

        loop {
            let scaled_w = (gray.width() as f64 / factor).round() as u32;
            let scaled_h = (gray.height() as f64 / factor).round() as u32;
            if scaled_w < self.width || scaled_h < self.height {
                break;
            }

            let win_w = (self.width as f64 * factor).round() as u32;
            let win_h = (self.height as f64 * factor).round() as u32;
            if win_w >= params.min_size && win_h >= params.min_size {
                let scaled = if factor == 1. {
                    Cow::Borrowed(gray)
                } else {
                    // Triangle widens with the downscale ratio, so deeper levels
                    // are area averaged rather than strictly bilinear
                    Cow::Owned(resize(gray, scaled_w, scaled_h, FilterType::Triangle))
                };

                self.scan_level(&scaled, factor, (win_w, win_h), &mut hits);
            }

            if params.scale_factor <= 1. {
                break;
            }
            factor *= params.scale_factor;
        }

        hits
    }

    fn scan_level(&self, img: &GrayImage, factor: f64, win: (u32, u32), hits: &mut Vec<Rect>) {
        let ii = Integral::new(img);
        let step = if factor > 2. { 1 } else { 2 };
        let x_end = img.width() - self.width;
        let y_end = img.height() - self.height;

        for y in (0..=y_end).step_by(step as usize) {
            let mut x = 0;
            while x <= x_end {
                match self.evaluate(&ii, x, y) {
                    Verdict::Accept => hits.push(Rect::new(
                        (x as f64 * factor).round() as u32,
                        (y as f64 * factor).round() as u32,
                        win.0,
                        win.1,
                    )),
                    // nothing here, neighbours are unlikely to do better
                    Verdict::Reject { stage: 0 } => x += step,
                    Verdict::Reject { .. } => {}
                }
                x += step;
            }
        }
    }
}

impl Cascade for HaarCascade {
    fn detect_multi_scale(&self, gray: &GrayImage, params: &ScanParams) -> Vec<Rect> {
        let span = span!(Level::TRACE, "haar_scan");
        let _guard = span.enter();

        let hits = self.raw_hits(gray, params);
        trace!("{} raw hits on {}x{}", hits.len(), gray.width(), gray.height());

        group_rectangles(hits, params.min_neighbors, GROUP_EPS)
    }
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input>(
    node: Node<'a, 'input>,
    name: &'static str,
) -> std::result::Result<Node<'a, 'input>, CascadeError> {
    elements(node)
        .find(|n| n.has_tag_name(name))
        .ok_or(CascadeError::Missing(name))
}

fn text<'a>(node: Node<'a, '_>, name: &'static str) -> std::result::Result<&'a str, CascadeError> {
    Ok(child(node, name)?.text().unwrap_or_default().trim())
}

fn parse_token<T: FromStr>(
    element: &'static str,
    token: &str,
) -> std::result::Result<T, CascadeError> {
    token.parse().map_err(|_| CascadeError::BadValue {
        element,
        value: token.to_string(),
    })
}

fn value<T: FromStr>(node: Node, name: &'static str) -> std::result::Result<T, CascadeError> {
    parse_token(name, text(node, name)?)
}

fn parse_stage(node: Node) -> std::result::Result<Stage, CascadeError> {
    let threshold: f64 = value(node, "stageThreshold")?;
    let classifiers = elements(child(node, "weakClassifiers")?)
        .map(parse_weak_classifier)
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Stage {
        threshold: threshold - THRESHOLD_EPS,
        classifiers,
    })
}

fn parse_weak_classifier(node: Node) -> std::result::Result<WeakClassifier, CascadeError> {
    let tokens: Vec<&str> = text(node, "internalNodes")?.split_whitespace().collect();
    if tokens.is_empty() || tokens.len() % 4 != 0 {
        return Err(CascadeError::BadValue {
            element: "internalNodes",
            value: tokens.join(" "),
        });
    }

    let nodes = tokens
        .chunks(4)
        .map(|t| -> std::result::Result<TreeNode, CascadeError> {
            Ok(TreeNode {
                left: parse_token("internalNodes", t[0])?,
                right: parse_token("internalNodes", t[1])?,
                feature: parse_token("internalNodes", t[2])?,
                threshold: parse_token("internalNodes", t[3])?,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    let leaves = text(node, "leafValues")?
        .split_whitespace()
        .map(|t| parse_token("leafValues", t))
        .collect::<std::result::Result<Vec<f64>, _>>()?;

    Ok(WeakClassifier { nodes, leaves })
}

fn parse_feature(node: Node) -> std::result::Result<Feature, CascadeError> {
    if let Ok(tilted) = text(node, "tilted") {
        if tilted != "0" {
            return Err(CascadeError::Unsupported("tilted haar features".to_string()));
        }
    }

    let rects = elements(child(node, "rects")?)
        .map(|r| {
            let raw = r.text().unwrap_or_default();
            let t: Vec<&str> = raw.split_whitespace().collect();
            if t.len() != 5 {
                return Err(CascadeError::BadValue {
                    element: "rects",
                    value: raw.trim().to_string(),
                });
            }

            Ok(WeightedRect {
                rect: Rect::new(
                    parse_token("rects", t[0])?,
                    parse_token("rects", t[1])?,
                    parse_token("rects", t[2])?,
                    parse_token("rects", t[3])?,
                ),
                weight: parse_token("rects", t[4])?,
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    if rects.is_empty() {
        return Err(CascadeError::Missing("rects"));
    }

    Ok(Feature { rects })
}
