use super::analysis::largest_polygon;
use super::{distinct_points, Coord, Geometry, Polygon, Ring};

/// Candidate shifts, identity first so it wins ties
const SHIFTS: [f64; 3] = [0.0, 360.0, -360.0];

/// Re-express longitudes so a geometry doesn't wrap around the world
pub fn normalize(geometry: &Geometry) -> Geometry {
    match geometry {
        Geometry::Point(_) => geometry.clone(),
        Geometry::Polygon(poly) => Geometry::Polygon(normalize_polygon(poly)),
        Geometry::LineString(line) => {
            let shift = seam_shift(line);
            Geometry::LineString(apply_seam_shift(line, shift))
        }
        Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(normalize_parts(polys)),
        Geometry::MultiLineString(lines) => Geometry::MultiLineString(normalize_lines(lines)),
    }
}

/// A ring crosses the seam when some edge spans more than half the world
fn crosses_seam(ring: &[Coord]) -> bool {
    ring.windows(2).any(|w| (w[1].0 - w[0].0).abs() > 180.0)
        || match (ring.first(), ring.last()) {
            (Some(first), Some(last)) => (first.0 - last.0).abs() > 180.0,
            _ => false,
        }
}

/// +360 moves western longitudes east, -360 moves eastern longitudes west
#[inline(always)]
fn seam_shift_lon(lon: f64, shift: f64) -> f64 {
    if (shift > 0.0 && lon < 0.0) || (shift < 0.0 && lon > 0.0) {
        lon + shift
    } else {
        lon
    }
}

fn lon_width(ring: &[Coord], shift: f64) -> f64 {
    let (min, max) = ring.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), c| {
        let lon = seam_shift_lon(c.0, shift);
        (min.min(lon), max.max(lon))
    });
    max - min
}

/// Shift that minimizes the ring's longitude width (0 if it doesn't cross)
fn seam_shift(ring: &[Coord]) -> f64 {
    if !crosses_seam(ring) {
        return 0.0;
    }
    let mut best = (0.0, lon_width(ring, 0.0));
    for shift in &SHIFTS[1..] {
        let width = lon_width(ring, *shift);
        if width < best.1 {
            best = (*shift, width);
        }
    }
    best.0
}

fn apply_seam_shift(ring: &[Coord], shift: f64) -> Ring {
    ring.iter()
        .map(|&(lon, lat)| (seam_shift_lon(lon, shift), lat))
        .collect()
}

fn normalize_polygon(poly: &Polygon) -> Polygon {
    let shift = seam_shift(poly.exterior());
    if shift == 0.0 {
        return poly.clone();
    }
    Polygon::new(poly.rings.iter().map(|r| apply_seam_shift(r, shift)).collect())
}

fn mean_lon(ring: &[Coord]) -> Option<f64> {
    let points = distinct_points(ring);
    if points.is_empty() {
        return None;
    }
    Some(points.iter().map(|c| c.0).sum::<f64>() / points.len() as f64)
}

/// Uniform shift whose resulting mean is closest to the reference mean
fn align_shift(ring: &[Coord], reference: f64) -> f64 {
    let Some(mean) = mean_lon(ring) else {
        return 0.0;
    };
    let mut best = (0.0, (mean - reference).abs());
    for shift in &SHIFTS[1..] {
        let distance = (mean + shift - reference).abs();
        if distance < best.1 {
            best = (*shift, distance);
        }
    }
    best.0
}

fn shift_ring(ring: &[Coord], shift: f64) -> Ring {
    ring.iter().map(|&(lon, lat)| (lon + shift, lat)).collect()
}

fn shift_polygon(poly: &Polygon, shift: f64) -> Polygon {
    Polygon::new(poly.rings.iter().map(|r| shift_ring(r, shift)).collect())
}

/// Add `shift` degrees to every longitude
pub fn shift_lon(geometry: &Geometry, shift: f64) -> Geometry {
    match geometry {
        Geometry::Point((lon, lat)) => Geometry::Point((lon + shift, *lat)),
        Geometry::LineString(line) => Geometry::LineString(shift_ring(line, shift)),
        Geometry::Polygon(poly) => Geometry::Polygon(shift_polygon(poly, shift)),
        Geometry::MultiLineString(lines) => {
            Geometry::MultiLineString(lines.iter().map(|l| shift_ring(l, shift)).collect())
        }
        Geometry::MultiPolygon(polys) => Geometry::MultiPolygon(polys.iter().map(|p| shift_polygon(p, shift)).collect()),
    }
}

fn normalize_parts(polys: &[Polygon]) -> Vec<Polygon> {
    let parts: Vec<Polygon> = polys.iter().map(normalize_polygon).collect();
    let Some((reference_idx, reference)) = largest_polygon(&parts) else {
        return parts;
    };
    let Some(reference_mean) = mean_lon(reference.exterior()) else {
        return parts;
    };

    parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            if i == reference_idx {
                return part.clone();
            }
            let shift = align_shift(part.exterior(), reference_mean);
            if shift == 0.0 {
                part.clone()
            } else {
                shift_polygon(part, shift)
            }
        })
        .collect()
}

fn normalize_lines(lines: &[Ring]) -> Vec<Ring> {
    let parts: Vec<Ring> = lines
        .iter()
        .map(|line| apply_seam_shift(line, seam_shift(line)))
        .collect();
    // Longest line by vertex count is the reference frame
    let Some((reference_idx, reference)) = parts
        .iter()
        .enumerate()
        .rev()
        .max_by_key(|(_, line)| line.len())
    else {
        return parts;
    };
    let Some(reference_mean) = mean_lon(reference) else {
        return parts;
    };

    parts
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == reference_idx {
                line.clone()
            } else {
                shift_ring(line, align_shift(line, reference_mean))
            }
        })
        .collect()
}
