use glam::DVec2;

use crate::surface::FillRule;

/// Visit every pixel on a line using Bresenham's algorithm
pub fn line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        plot(x, y);

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

/// Thicker line: the base line plus copies offset right and down
pub fn thick_line(x0: i32, y0: i32, x1: i32, y1: i32, mut plot: impl FnMut(i32, i32)) {
    line(x0, y0, x1, y1, &mut plot);
    line(x0 + 1, y0, x1 + 1, y1, &mut plot);
    line(x0, y0 + 1, x1, y1 + 1, &mut plot);
}

/// Liang-Barsky clip of the segment `a`-`b` to the box `[0, max.x] x [0, max.y]`.
/// Returns `None` when nothing of the segment is inside.
pub fn clip_segment(a: DVec2, b: DVec2, max: DVec2) -> Option<(DVec2, DVec2)> {
    if !a.is_finite() || !b.is_finite() {
        return None;
    }
    let d = b - a;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [(-d.x, a.x), (d.x, max.x - a.x), (-d.y, a.y), (d.y, max.y - a.y)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((a + d * t0, a + d * t1))
}

/// Scanline polygon fill over closed rings in device space.
/// Pixel centers (x + 0.5, y + 0.5) are tested against the fill rule.
/// Only pixels inside `width` x `height` are visited.
pub fn fill_rings(rings: &[Vec<DVec2>], rule: FillRule, width: i32, height: i32, mut plot: impl FnMut(i32, i32)) {
    let mut edges: Vec<(DVec2, DVec2)> = Vec::new();
    for ring in rings {
        if ring.len() < 3 || !ring.iter().all(|p| p.is_finite()) {
            continue;
        }
        for i in 0..ring.len() {
            let a = ring[i];
            let b = ring[(i + 1) % ring.len()];
            if a.y != b.y {
                edges.push((a, b));
            }
        }
    }
    if edges.is_empty() || width <= 0 || height <= 0 {
        return;
    }

    let min_y = edges.iter().map(|(a, b)| a.y.min(b.y)).fold(f64::INFINITY, f64::min);
    let max_y = edges.iter().map(|(a, b)| a.y.max(b.y)).fold(f64::NEG_INFINITY, f64::max);
    let row_start = min_y.floor().max(0.0) as i32;
    let row_end = max_y.ceil().min(height as f64) as i32;
    let last_col = width as f64 - 1.0;

    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for py in row_start..row_end {
        let y = py as f64 + 0.5;
        crossings.clear();
        for (a, b) in &edges {
            if (a.y <= y) != (b.y <= y) {
                let x = a.x + (y - a.y) / (b.y - a.y) * (b.x - a.x);
                let dir = if b.y > a.y { 1 } else { -1 };
                crossings.push((x, dir));
            }
        }
        crossings.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            winding += pair[0].1;
            let inside = match rule {
                FillRule::EvenOdd => winding % 2 != 0,
                FillRule::NonZero => winding != 0,
            };
            if !inside {
                continue;
            }
            let start = (pair[0].0 - 0.5).ceil().max(0.0);
            let end = (pair[1].0 - 0.5).floor().min(last_col);
            if start > end {
                continue;
            }
            for px in start as i32..=end as i32 {
                plot(px, py);
            }
        }
    }
}
