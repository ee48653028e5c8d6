/// Axis aligned region, anchored at its top-left corner.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl From<Rect> for imageproc::rect::Rect {
    fn from(r: Rect) -> imageproc::rect::Rect {
        imageproc::rect::Rect::at(r.x as i32, r.y as i32).of_size(r.w.max(1), r.h.max(1))
    }
}

impl Rect {
    pub fn new(x: u32, y: u32, w: u32, h: u32) -> Rect {
        Rect { x, y, w, h }
    }

    pub fn left(&self) -> u32 {
        self.x
    }
    pub fn right(&self) -> u32 {
        self.x + self.w
    }
    pub fn top(&self) -> u32 {
        self.y
    }
    pub fn bottom(&self) -> u32 {
        self.y + self.h
    }
    pub fn area(&self) -> u32 {
        self.w * self.h
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }

    /// Translate a rect expressed relative to `origin` into the coordinate
    /// space `origin` lives in.
    pub fn offset_by(&self, origin: &Rect) -> Rect {
        Rect {
            x: self.x + origin.x,
            y: self.y + origin.y,
            w: self.w,
            h: self.h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_by() {
        let face = Rect::new(50, 60, 100, 100);
        let eye = Rect::new(10, 20, 15, 12);

        assert_eq!(eye.offset_by(&face), Rect::new(60, 80, 15, 12));
    }
}
