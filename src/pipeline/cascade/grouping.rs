use crate::shapes::rect::Rect;

/// Merge clusters of overlapping hits into single regions.
///
/// Hits are clustered by similarity (corners within `eps` of the smaller
/// side), each cluster is averaged, and clusters with `group_threshold` or
/// fewer members are dropped, as are clusters sitting inside a better
/// supported one. Output follows the order in which clusters first appear.
/// A threshold of 0 returns the hits untouched.
pub fn group_rectangles(rects: Vec<Rect>, group_threshold: u32, eps: f64) -> Vec<Rect> {
    if group_threshold == 0 || rects.is_empty() {
        return rects;
    }

    let labels = partition(&rects, eps);
    let classes = labels.iter().max().map_or(0, |max| max + 1);

    let mut sums = vec![[0u64; 4]; classes];
    let mut counts = vec![0u32; classes];
    for (r, &label) in rects.iter().zip(labels.iter()) {
        let s = &mut sums[label];
        s[0] += r.x as u64;
        s[1] += r.y as u64;
        s[2] += r.w as u64;
        s[3] += r.h as u64;
        counts[label] += 1;
    }

    let averaged: Vec<Rect> = sums
        .iter()
        .zip(counts.iter())
        .map(|(s, &n)| {
            let inv = 1. / n as f64;
            Rect::new(
                (s[0] as f64 * inv).round() as u32,
                (s[1] as f64 * inv).round() as u32,
                (s[2] as f64 * inv).round() as u32,
                (s[3] as f64 * inv).round() as u32,
            )
        })
        .collect();

    averaged
        .iter()
        .enumerate()
        .filter(|&(i, r1)| {
            let n1 = counts[i];
            if n1 <= group_threshold {
                return false;
            }

            !averaged.iter().enumerate().any(|(j, r2)| {
                let n2 = counts[j];
                j != i
                    && n2 > group_threshold
                    && nested_within(r1, r2, eps)
                    && (n2 > n1.max(3) || n1 < 3)
            })
        })
        .map(|(_, r)| *r)
        .collect()
}

fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.w.min(b.w) + a.h.min(b.h)) as f64 * 0.5;
    let close = |p: u32, q: u32| (p as f64 - q as f64).abs() <= delta;

    close(a.left(), b.left())
        && close(a.top(), b.top())
        && close(a.right(), b.right())
        && close(a.bottom(), b.bottom())
}

fn nested_within(inner: &Rect, outer: &Rect, eps: f64) -> bool {
    let dx = (outer.w as f64 * eps).round() as i64;
    let dy = (outer.h as f64 * eps).round() as i64;

    inner.left() as i64 >= outer.left() as i64 - dx
        && inner.top() as i64 >= outer.top() as i64 - dy
        && inner.right() as i64 <= outer.right() as i64 + dx
        && inner.bottom() as i64 <= outer.bottom() as i64 + dy
}

// Label equivalence classes of similar rects, numbering classes by the
// index of their first member.
fn partition(rects: &[Rect], eps: f64) -> Vec<usize> {
    let mut parent: Vec<usize> = (0..rects.len()).collect();

    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if similar(&rects[i], &rects[j], eps) {
                let ri = find(&mut parent, i);
                let rj = find(&mut parent, j);
                if ri != rj {
                    parent[ri.max(rj)] = ri.min(rj);
                }
            }
        }
    }

    let mut root_labels: Vec<Option<usize>> = vec![None; rects.len()];
    let mut next = 0;
    let mut labels = Vec::with_capacity(rects.len());
    for i in 0..rects.len() {
        let root = find(&mut parent, i);
        let label = match root_labels[root] {
            Some(l) => l,
            None => {
                root_labels[root] = Some(next);
                next += 1;
                next - 1
            }
        };
        labels.push(label);
    }

    labels
}

fn find(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 0.2;

    #[test]
    fn test_zero_threshold_keeps_raw_hits() {
        let hits = vec![Rect::new(0, 0, 4, 4), Rect::new(1, 0, 4, 4)];
        assert_eq!(group_rectangles(hits.clone(), 0, EPS), hits);
    }

    #[test]
    fn test_cluster_is_averaged_and_outliers_dropped() {
        let hits = vec![
            Rect::new(10, 10, 20, 20),
            Rect::new(100, 100, 20, 20),
            Rect::new(11, 10, 20, 20),
            Rect::new(10, 11, 20, 21),
        ];

        assert_eq!(group_rectangles(hits, 2, EPS), vec![Rect::new(10, 10, 20, 20)]);
    }

    #[test]
    fn test_weak_cluster_inside_strong_cluster_is_dropped() {
        let mut hits = vec![Rect::new(60, 60, 30, 30); 3];
        hits.extend(vec![Rect::new(50, 50, 100, 100); 5]);

        assert_eq!(group_rectangles(hits, 2, EPS), vec![Rect::new(50, 50, 100, 100)]);
    }

    #[test]
    fn test_clusters_keep_first_seen_order() {
        let hits = vec![
            Rect::new(200, 0, 40, 40),
            Rect::new(0, 0, 40, 40),
            Rect::new(201, 1, 40, 40),
            Rect::new(1, 1, 40, 40),
            Rect::new(200, 1, 40, 40),
            Rect::new(0, 1, 40, 40),
        ];

        let grouped = group_rectangles(hits, 2, EPS);
        assert_eq!(grouped, vec![Rect::new(200, 1, 40, 40), Rect::new(0, 1, 40, 40)]);
    }
}
