use crate::shapes::rect::Rect;

/// Keep only the two tallest regions when a detector over-fires.
///
/// Height is the only size measure. Sets of two or fewer pass through
/// untouched; otherwise the taller of the pair comes first, and on equal
/// heights the earlier region wins.
pub fn select_largest_two(rects: Vec<Rect>) -> Vec<Rect> {
    if rects.len() <= 2 {
        return rects;
    }

    let (mut largest, mut second) = if rects[1].h > rects[0].h {
        (rects[1], rects[0])
    } else {
        (rects[0], rects[1])
    };

    for r in &rects[2..] {
        if r.h > second.h {
            if r.h > largest.h {
                second = largest;
                largest = *r;
            } else {
                second = *r;
            }
        }
    }

    vec![largest, second]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_heights(heights: &[u32]) -> Vec<Rect> {
        heights
            .iter()
            .enumerate()
            .map(|(i, &h)| Rect::new(i as u32 * 10, 0, 10, h))
            .collect()
    }

    #[test]
    fn test_small_sets_pass_through() {
        for heights in [&[][..], &[4][..], &[3, 9][..]] {
            let rects = with_heights(heights);
            assert_eq!(select_largest_two(rects.clone()), rects);
        }
    }

    #[test]
    fn test_picks_two_tallest() {
        let selected = select_largest_two(with_heights(&[5, 2, 9, 1, 7]));

        assert_eq!(selected, vec![Rect::new(20, 0, 10, 9), Rect::new(40, 0, 10, 7)]);
    }

    #[test]
    fn test_ties_keep_first_seen() {
        let selected = select_largest_two(with_heights(&[6, 6, 6, 6]));

        assert_eq!(selected, vec![Rect::new(0, 0, 10, 6), Rect::new(10, 0, 10, 6)]);
    }

    #[test]
    fn test_width_is_ignored() {
        let rects = vec![
            Rect::new(0, 0, 100, 4),
            Rect::new(0, 0, 1, 5),
            Rect::new(0, 0, 1, 6),
        ];

        let selected = select_largest_two(rects);
        assert!(selected.iter().all(|r| r.w == 1));
    }

    #[test]
    fn test_no_excluded_region_is_taller() {
        let heights = [3, 14, 8, 14, 2, 11, 9, 13, 1];
        let rects = with_heights(&heights);
        let selected = select_largest_two(rects.clone());

        assert_eq!(selected.len(), 2);
        let floor = selected.iter().map(|r| r.h).min().unwrap();
        for r in rects.iter().filter(|r| !selected.contains(r)) {
            assert!(r.h <= floor);
        }
    }
}
