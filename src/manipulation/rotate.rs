use crate::shapes::point::PointF32;
use image::{ImageBuffer, Pixel};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};

/// Rotate `img` counter-clockwise by `degrees` about its centre, onto a
/// canvas grown to the rotated bounding box. Uncovered pixels are `fill`.
pub fn rotate_expanded<P>(
    img: &ImageBuffer<P, Vec<u8>>,
    degrees: f64,
    fill: P,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync + 'static,
{
    let (width, height) = img.dimensions();
    let (out_w, out_h) = rotated_bounds(width, height, degrees);

    // y grows downward, so counter-clockwise on screen is a negative angle
    let theta = -(degrees.to_radians() as f32);
    let projection = Projection::translate(out_w as f32 / 2., out_h as f32 / 2.)
        * Projection::rotate(theta)
        * Projection::translate(-(width as f32) / 2., -(height as f32) / 2.);

    let mut out = ImageBuffer::from_pixel(out_w, out_h, fill);
    warp_into(img, &projection, Interpolation::Bilinear, fill, &mut out);
    out
}

/// Integer box around a `width` x `height` rectangle turned by `degrees`,
/// floored on the low side and ceiled on the high side, inclusive.
pub fn rotated_bounds(width: u32, height: u32, degrees: f64) -> (u32, u32) {
    let center = PointF32::new(width as f32 / 2., height as f32 / 2.);
    let theta = -(degrees.to_radians() as f32);
    let corners = [
        PointF32::new(0., 0.),
        PointF32::new(width as f32, 0.),
        PointF32::new(width as f32, height as f32),
        PointF32::new(0., height as f32),
    ]
    .map(|p| p.rotate(center, theta));

    let span = |axis: fn(&PointF32) -> f32| {
        let lo = corners.iter().map(axis).fold(f32::INFINITY, f32::min);
        let hi = corners.iter().map(axis).fold(f32::NEG_INFINITY, f32::max);
        (hi.ceil() - lo.floor()) as u32 + 1
    };

    (span(|p| p.x), span(|p| p.y))
}
