#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointF32 {
    pub x: f32,
    pub y: f32,
}

impl PointF32 {
    pub fn new(x: f32, y: f32) -> PointF32 {
        PointF32 { x, y }
    }

    // Clockwise in image space (y grows downward)
    pub fn rotate(&self, origin: PointF32, theta: f32) -> PointF32 {
        let x = self.x - origin.x;
        let y = self.y - origin.y;

        PointF32 {
            x: origin.x + x * theta.cos() - y * theta.sin(),
            y: origin.y + x * theta.sin() + y * theta.cos(),
        }
    }
}

/// Placement origin on a target image. Signed, since an overlay may hang
/// off the top or left edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Point {
        Point { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_quarter_turn() {
        let p = PointF32::new(2., 1.);
        let rotated = p.rotate(PointF32::new(1., 1.), std::f32::consts::FRAC_PI_2);

        assert!((rotated.x - 1.).abs() < 1e-5);
        assert!((rotated.y - 2.).abs() < 1e-5);
    }
}
