//! Shape rasterization into shared video frames.
//!
//! Coordinates are signed and may run past the view edges; writes outside
//! the frame are dropped by the clamped pixel accessors, so callers can
//! overdraw freely while a ball crosses a border.

use avbus_ring::FrameBuf;

fn put(frame: &mut FrameBuf<'_>, x: i64, y: i64, col: [u8; 3]) {
    if x >= 0 && y >= 0 {
        frame.set_pixel(x as usize, y as usize, col);
    }
}

fn span(frame: &mut FrameBuf<'_>, y: i64, x1: i64, x2: i64, col: [u8; 3]) {
    if y < 0 || y >= frame.height() as i64 {
        return;
    }
    let x1 = x1.max(0) as usize;
    let x2 = x2.max(0) as usize;
    frame.fill_span(y as usize, x1, x2, col);
}

/// Draws a line between two points. Axis-aligned lines take the fast span
/// path; anything else steps the major axis one pixel at a time.
pub fn draw_line(frame: &mut FrameBuf<'_>, x1: i64, y1: i64, x2: i64, y2: i64, col: [u8; 3]) {
    if y1 == y2 {
        let (a, b) = if x1 > x2 { (x2, x1) } else { (x1, x2) };
        span(frame, y1, a, b, col);
        return;
    }
    if x1 == x2 {
        let (a, b) = if y1 > y2 { (y2, y1) } else { (y1, y2) };
        for y in a..b {
            put(frame, x1, y, col);
        }
        return;
    }

    let sx = (x2 - x1).abs();
    let dx = if x1 < x2 { 1 } else { -1 };
    let sy = (y2 - y1).abs();
    let dy = if y1 < y2 { 1 } else { -1 };

    let (mut x, mut y) = (x1, y1);
    let (mut mx, mut my) = (0i64, 0i64);
    put(frame, x, y, col);

    let mut left = sx + sy;
    while left > 0 {
        left -= 1;
        mx += sx;
        if mx >= sy {
            x += dx;
            if (dx > 0 && (x < x1 || x > x2)) || (dx < 0 && (x < x2 || x > x1)) {
                break;
            }
            mx -= sy;
            put(frame, x, y, col);
        }
        my += sy;
        if my >= sx {
            y += dy;
            if (dy > 0 && (y < y1 || y > y2)) || (dy < 0 && (y < y2 || y > y1)) {
                break;
            }
            my -= sx;
            put(frame, x, y, col);
        }
    }
}

/// Draws a rectangle outline with corners `(x1, y1)` and `(x2, y2)`.
pub fn draw_rect(frame: &mut FrameBuf<'_>, x1: i64, y1: i64, x2: i64, y2: i64, col: [u8; 3]) {
    draw_line(frame, x1, y1, x2, y1, col);
    draw_line(frame, x1, y2, x2, y2, col);
    draw_line(frame, x1, y1, x1, y2, col);
    draw_line(frame, x2, y1, x2, y2, col);
}

/// Fills the rectangle `[x1, x2) × [y1, y2)`.
pub fn fill_rect(frame: &mut FrameBuf<'_>, x1: i64, y1: i64, x2: i64, y2: i64, col: [u8; 3]) {
    let (y1, y2) = if y1 > y2 { (y2, y1) } else { (y1, y2) };
    for y in y1..y2 {
        span(frame, y, x1, x2, col);
    }
}

/// Draws an arc around `(cx, cy)` between `start` and `end` degrees.
pub fn draw_arc(
    frame: &mut FrameBuf<'_>,
    cx: i64,
    cy: i64,
    r: i64,
    start: f64,
    end: f64,
    col: [u8; 3],
) {
    if r <= 0 || end <= start {
        return;
    }
    let arc = (end - start).to_radians();
    let pts = ((r as f64 * std::f64::consts::PI) * (end - start) / 360.0) as i64 * 2;
    let step = arc / pts.max(1) as f64;
    for i in 0..pts.max(1) {
        let a = start.to_radians() + i as f64 * step;
        let px = cx + (r as f64 * a.cos()).round() as i64;
        let py = cy + (r as f64 * a.sin()).round() as i64;
        put(frame, px, py, col);
    }
}

/// Fills a circle row by row. `ls` and `rs` scale the left and right
/// half-widths; `1.0` each gives a full disc, smaller values shave a side
/// (the shaded-ball highlight uses a shrinking `ls`).
pub fn fill_circle(
    frame: &mut FrameBuf<'_>,
    cx: i64,
    cy: i64,
    r: i64,
    col: [u8; 3],
    ls: f64,
    rs: f64,
) {
    for dy in -r..=r {
        let half = ((r * r - dy * dy) as f64).sqrt();
        let x1 = (cx as f64 - ls * half).round() as i64;
        let x2 = (cx as f64 + rs * half).round() as i64;
        if x2 > x1 {
            span(frame, cy + dy, x1, x2, col);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use avbus_ring::{OpenMode, ShareName, VideoOptions, VideoRing, VideoShape};

    fn ring(tag: &str) -> VideoRing {
        VideoRing::create(VideoOptions {
            name: Some(ShareName::from(format!(
                "avbus_shapes_test_{tag}_{}",
                std::process::id()
            ))),
            shape: VideoShape {
                buffers: 1,
                width: 40,
                height: 30,
                fps: 1,
            },
            mode: Some(OpenMode::New),
            cleanup: true,
        })
        .unwrap()
    }

    #[test]
    fn horizontal_line_fills_the_row() {
        let r = ring("hline");
        let mut f = r.frame(0).unwrap();
        draw_line(&mut f, 5, 3, 15, 3, [9, 9, 9]);
        for x in 5..15 {
            assert_eq!(f.pixel(x, 3).unwrap(), [9, 9, 9]);
        }
        assert_eq!(f.pixel(16, 3).unwrap(), [0, 0, 0]);
    }

    #[test]
    fn out_of_bounds_drawing_is_clamped() {
        let r = ring("oob");
        let mut f = r.frame(0).unwrap();
        // All of these overhang an edge; none may write outside the frame.
        draw_rect(&mut f, -5, -5, 44, 34, [1, 2, 3]);
        fill_circle(&mut f, 0, 0, 10, [4, 5, 6], 1.0, 1.0);
        draw_line(&mut f, -10, -10, 60, 45, [7, 8, 9]);
        draw_arc(&mut f, 39, 29, 8, 0.0, 360.0, [1, 1, 1]);
    }

    #[test]
    fn filled_circle_covers_center_and_respects_side_scalars() {
        let r = ring("circle");
        let mut f = r.frame(0).unwrap();
        fill_circle(&mut f, 20, 15, 6, [200, 0, 0], 1.0, 1.0);
        assert_eq!(f.pixel(20, 15).unwrap(), [200, 0, 0]);
        assert_eq!(f.pixel(16, 15).unwrap(), [200, 0, 0]);
        // Outside the radius stays untouched.
        assert_eq!(f.pixel(20, 5).unwrap(), [0, 0, 0]);

        // Negative left scalar shaves everything left of center.
        let mut f = r.frame(0).unwrap();
        f.clear();
        fill_circle(&mut f, 20, 15, 6, [0, 200, 0], -0.2, 1.0);
        assert_eq!(f.pixel(15, 15).unwrap(), [0, 0, 0]);
        assert_eq!(f.pixel(24, 15).unwrap(), [0, 200, 0]);
    }
}
