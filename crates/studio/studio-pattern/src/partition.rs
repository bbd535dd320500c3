//! Recursive bisection of a frame into disjoint worker regions.
//!
//! Each call splits the current largest rectangle along its longer (or
//! equal) axis, so repeatedly adding rectangles keeps the covering roughly
//! square and assigns every source a non-overlapping ROI.

use avbus_ring::Rect;

/// Splits the largest rectangle in `rects` in two: the first half shrinks in
/// place, the second is appended and returned. Ties go to the first maximum.
/// Returns `None` when the list is empty.
pub fn add_rect(rects: &mut Vec<Rect>) -> Option<Rect> {
    let mut best = None;
    let mut area = 0usize;
    for (k, r) in rects.iter().enumerate() {
        if r.area() > area {
            area = r.area();
            best = Some(k);
        }
    }
    let k = best?;

    let r = &mut rects[k];
    let n = if r.w >= r.h {
        let w1 = r.w / 2;
        let w2 = r.w - w1;
        r.w = w1;
        Rect::new(r.x + w1, r.y, w2, r.h)
    } else {
        let h1 = r.h / 2;
        let h2 = r.h - h1;
        r.h = h1;
        Rect::new(r.x, r.y + h1, r.w, h2)
    };

    rects.push(n);
    Some(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overlap(a: &Rect, b: &Rect) -> bool {
        a.x < b.x + b.w && b.x < a.x + a.w && a.y < b.y + b.h && b.y < a.y + a.h
    }

    fn check_covering(rects: &[Rect], w: usize, h: usize) {
        // Pairwise disjoint.
        for i in 0..rects.len() {
            for j in i + 1..rects.len() {
                assert!(
                    !overlap(&rects[i], &rects[j]),
                    "rects {i} and {j} overlap: {:?} {:?}",
                    rects[i],
                    rects[j]
                );
            }
        }
        // Exact union: areas sum to the whole and every cell is covered on a
        // coarse sample grid.
        let total: usize = rects.iter().map(Rect::area).sum();
        assert_eq!(total, w * h);
        for y in (0..h).step_by(7) {
            for x in (0..w).step_by(7) {
                assert!(
                    rects
                        .iter()
                        .any(|r| x >= r.x && x < r.x + r.w && y >= r.y && y < r.y + r.h),
                    "point {x},{y} uncovered"
                );
            }
        }
    }

    #[test]
    fn repeated_splits_stay_a_disjoint_exact_covering() {
        let (w, h) = (800usize, 600usize);
        let mut rects = vec![Rect::new(0, 0, w, h)];
        for k in 0..15 {
            let added = add_rect(&mut rects).expect("split");
            assert!(added.area() > 0);
            assert_eq!(rects.len(), k + 2);
            check_covering(&rects, w, h);
        }
    }

    #[test]
    fn splits_run_along_the_longer_axis() {
        // Wider than tall: the split is vertical.
        let mut rects = vec![Rect::new(0, 0, 100, 40)];
        let n = add_rect(&mut rects).unwrap();
        assert_eq!(rects[0], Rect::new(0, 0, 50, 40));
        assert_eq!(n, Rect::new(50, 0, 50, 40));

        // Taller than wide: horizontal.
        let mut rects = vec![Rect::new(0, 0, 40, 101)];
        let n = add_rect(&mut rects).unwrap();
        assert_eq!(rects[0], Rect::new(0, 0, 40, 50));
        assert_eq!(n, Rect::new(0, 50, 40, 51));
    }

    #[test]
    fn odd_lengths_split_floor_then_remainder() {
        let mut rects = vec![Rect::new(0, 0, 7, 3)];
        let n = add_rect(&mut rects).unwrap();
        assert_eq!(rects[0].w, 3);
        assert_eq!(n.w, 4);
    }

    #[test]
    fn largest_rectangle_wins_first_on_ties() {
        let mut rects = vec![Rect::new(0, 0, 10, 10), Rect::new(10, 0, 10, 10)];
        add_rect(&mut rects);
        // The first of the two equal-area rects was split.
        assert_eq!(rects[0].w, 5);
        assert_eq!(rects[1], Rect::new(10, 0, 10, 10));
    }

    #[test]
    fn empty_input_yields_none() {
        let mut rects: Vec<Rect> = Vec::new();
        assert!(add_rect(&mut rects).is_none());
    }
}
