use crate::braille::BrailleCanvas;
use glam::DVec2;

/// Draw a line using Bresenham's algorithm
pub fn draw_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        canvas.set_pixel_signed(x, y);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Draw a thicker line (selected or hovered links)
pub fn draw_thick_line(canvas: &mut BrailleCanvas, x0: i32, y0: i32, x1: i32, y1: i32) {
    draw_line(canvas, x0, y0, x1, y1);
    draw_line(canvas, x0 + 1, y0, x1 + 1, y1);
    draw_line(canvas, x0, y0 + 1, x1, y1 + 1);
}

/// Distance in pixels from a point to a line segment.
/// Used for hit-testing links under the cursor.
pub fn point_segment_distance(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> f64 {
    let p = DVec2::new(p.0 as f64, p.1 as f64);
    let a = DVec2::new(a.0 as f64, a.1 as f64);
    let b = DVec2::new(b.0 as f64, b.1 as f64);

    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq == 0.0 {
        return (p - a).length();
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    (p - (a + ab * t)).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_line() {
        let mut canvas = BrailleCanvas::new(5, 1);
        draw_line(&mut canvas, 0, 0, 9, 0);
        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_vertical_line() {
        let mut canvas = BrailleCanvas::new(1, 2);
        draw_line(&mut canvas, 0, 0, 0, 7);
        assert!(!canvas.is_blank());
    }

    #[test]
    fn test_segment_distance_on_segment() {
        assert_eq!(point_segment_distance((5, 0), (0, 0), (10, 0)), 0.0);
    }

    #[test]
    fn test_segment_distance_perpendicular() {
        assert_eq!(point_segment_distance((5, 3), (0, 0), (10, 0)), 3.0);
    }

    #[test]
    fn test_segment_distance_past_endpoint() {
        // Closest point is the endpoint, not the infinite line
        assert_eq!(point_segment_distance((13, 4), (0, 0), (10, 0)), 5.0);
    }

    #[test]
    fn test_segment_distance_degenerate() {
        assert_eq!(point_segment_distance((3, 4), (0, 0), (0, 0)), 5.0);
    }
}
