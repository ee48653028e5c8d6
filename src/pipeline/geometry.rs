use crate::shapes::rect::Rect;

/// Naive head tilt, in degrees, from the slope of the line through two
/// eye regions' corners. Positive means the overlay should turn
/// counter-clockwise to follow the head.
///
/// Eyes stacked vertically clamp to ±90°, and identical positions give 0.
pub fn estimate_tilt(a: &Rect, b: &Rect) -> f64 {
    let height_delta = a.y as f64 - b.y as f64;
    let width_delta = a.x as f64 - b.x as f64;

    let angle = if width_delta != 0. {
        (height_delta / width_delta).atan().to_degrees()
    } else if height_delta > 0. {
        90.
    } else if height_delta < 0. {
        -90.
    } else {
        0.
    };

    -angle
}
