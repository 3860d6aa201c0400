use super::{distinct_points, Coord, Geometry, Polygon};

/// Grid resolution of the interior scan fallback
const GRID_STEPS: usize = 10;

/// Padding fraction used by [`padded_bounds`]
const BOUNDS_PADDING: f64 = 0.1;

/// Longitude/latitude bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min_lon: f64::INFINITY,
            max_lon: f64::NEG_INFINITY,
            min_lat: f64::INFINITY,
            max_lat: f64::NEG_INFINITY,
        }
    }

    fn extend(&mut self, (lon, lat): Coord) {
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    fn is_empty(&self) -> bool {
        self.min_lon > self.max_lon || self.min_lat > self.max_lat
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    pub fn center(&self) -> Coord {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }

    pub fn of_coords(coords: impl IntoIterator<Item = Coord>) -> Option<Self> {
        let mut bounds = Self::empty();
        for c in coords {
            bounds.extend(c);
        }
        (!bounds.is_empty()).then_some(bounds)
    }
}

/// Signed shoelace area of a ring (positive for counter-clockwise)
pub fn ring_area(ring: &[Coord]) -> f64 {
    let points = distinct_points(ring);
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (x0, y0) = points[j];
        let (x1, y1) = points[i];
        sum += x0 * y1 - x1 * y0;
        j = i;
    }
    sum / 2.0
}

/// Even-odd ray casting test against a single ring
pub fn point_in_ring((px, py): Coord, ring: &[Coord]) -> bool {
    let points = distinct_points(ring);
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (xi, yi) = points[i];
        let (xj, yj) = points[j];
        if (yi > py) != (yj > py) && px < (xj - xi) * (py - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Arithmetic mean of the ring's distinct vertices
pub fn ring_centroid(ring: &[Coord]) -> Option<Coord> {
    let points = distinct_points(ring);
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let (sx, sy) = points
        .iter()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    Some((sx / n, sy / n))
}

/// Index and reference of the part with the largest outer-ring area.
/// Ties keep the earlier part.
pub fn largest_polygon(polygons: &[Polygon]) -> Option<(usize, &Polygon)> {
    let mut best: Option<(usize, &Polygon, f64)> = None;
    for (i, poly) in polygons.iter().enumerate() {
        let area = ring_area(poly.exterior()).abs();
        if best.map_or(true, |(_, _, a)| area > a) {
            best = Some((i, poly, area));
        }
    }
    best.map(|(i, poly, _)| (i, poly))
}

/// Point for label placement that lies inside the shape when one can be found
pub fn visual_center(geometry: &Geometry) -> Option<Coord> {
    match geometry {
        Geometry::Point(c) => Some(*c),
        Geometry::Polygon(poly) => polygon_visual_center(poly),
        Geometry::MultiPolygon(polys) => {
            let (_, largest) = largest_polygon(polys)?;
            polygon_visual_center(largest)
        }
        Geometry::LineString(line) => line.get(line.len() / 2).copied(),
        Geometry::MultiLineString(lines) => {
            // Longest part by vertex count; first wins on ties
            let mut longest: Option<&Vec<Coord>> = None;
            for line in lines {
                if longest.map_or(true, |l| line.len() > l.len()) {
                    longest = Some(line);
                }
            }
            longest.and_then(|line| line.get(line.len() / 2).copied())
        }
    }
}

fn polygon_visual_center(poly: &Polygon) -> Option<Coord> {
    if poly.is_degenerate() {
        return None;
    }
    let ring = poly.exterior();
    let centroid = ring_centroid(ring)?;
    if point_in_ring(centroid, ring) {
        return Some(centroid);
    }

    let bounds = Bounds::of_coords(ring.iter().copied())?;
    let center = bounds.center();
    if point_in_ring(center, ring) {
        return Some(center);
    }

    let step_lon = bounds.width() / GRID_STEPS as f64;
    let step_lat = bounds.height() / GRID_STEPS as f64;
    for j in 0..GRID_STEPS {
        for i in 0..GRID_STEPS {
            let candidate = (
                bounds.min_lon + (i as f64 + 0.5) * step_lon,
                bounds.min_lat + (j as f64 + 0.5) * step_lat,
            );
            if point_in_ring(candidate, ring) {
                return Some(candidate);
            }
        }
    }

    // Thin or crescent shapes can defeat the grid; accept the outside centroid
    log::debug!("no interior grid point found, using centroid {:?}", centroid);
    Some(centroid)
}

/// Bounding box over all coordinates. A point gets a synthetic ±1° box.
pub fn bounding_box(geometry: &Geometry) -> Option<Bounds> {
    match geometry {
        Geometry::Point((lon, lat)) => Some(Bounds {
            min_lon: lon - 1.0,
            max_lon: lon + 1.0,
            min_lat: lat - 1.0,
            max_lat: lat + 1.0,
        }),
        _ => Bounds::of_coords(geometry.coords()),
    }
}

/// Bounding box with 10% padding on each axis
pub fn padded_bounds(geometry: &Geometry) -> Option<Bounds> {
    let b = bounding_box(geometry)?;
    let pad_lon = b.width() * BOUNDS_PADDING;
    let pad_lat = b.height() * BOUNDS_PADDING;
    Some(Bounds {
        min_lon: b.min_lon - pad_lon,
        max_lon: b.max_lon + pad_lon,
        min_lat: b.min_lat - pad_lat,
        max_lat: b.max_lat + pad_lat,
    })
}

/// Total outer-ring area of all polygon parts, in square degrees
pub fn polygon_area(geometry: &Geometry) -> f64 {
    match geometry {
        Geometry::Polygon(poly) => ring_area(poly.exterior()).abs(),
        Geometry::MultiPolygon(polys) => polys.iter().map(|p| ring_area(p.exterior()).abs()).sum(),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn polygon(points: &[Coord]) -> Polygon {
        Polygon::new(vec![points.to_vec()])
    }

    fn square(x: f64, y: f64, size: f64) -> Polygon {
        polygon(&[(x, y), (x + size, y), (x + size, y + size), (x, y + size), (x, y)])
    }

    /// U shape: notch open to the north between x=3 and x=7 above y=3
    fn u_shape() -> Polygon {
        polygon(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (7.0, 10.0),
            (7.0, 3.0),
            (3.0, 3.0),
            (3.0, 10.0),
            (0.0, 10.0),
            (0.0, 0.0),
        ])
    }

    #[test]
    fn test_square_visual_center() {
        let geom = Geometry::Polygon(square(0.0, 0.0, 10.0));
        assert_eq!(visual_center(&geom), Some((5.0, 5.0)));
    }

    #[test]
    fn test_convex_polygons_contain_center() {
        let shapes = [
            polygon(&[(0.0, 0.0), (6.0, 1.0), (3.0, 5.0), (0.0, 0.0)]),
            polygon(&[(-3.0, -1.0), (4.0, -2.0), (6.0, 3.0), (1.0, 7.0), (-4.0, 3.0)]),
            square(100.0, -40.0, 0.5),
        ];
        for shape in shapes {
            let center = visual_center(&Geometry::Polygon(shape.clone())).unwrap();
            assert!(point_in_ring(center, shape.exterior()), "{:?} outside {:?}", center, shape);
        }
    }

    #[test]
    fn test_concave_fallback_lands_inside() {
        let u = u_shape();
        let centroid = ring_centroid(u.exterior()).unwrap();
        assert!(!point_in_ring(centroid, u.exterior()), "fixture centroid should be in the notch");

        let center = visual_center(&Geometry::Polygon(u.clone())).unwrap();
        assert_ne!(center, centroid);
        assert!(point_in_ring(center, u.exterior()));
    }

    #[test]
    fn test_largest_part_wins() {
        let big = square(0.0, 0.0, 10.0);
        let tiny = square(50.0, 50.0, 1.0);
        let parts = vec![tiny, big.clone()];
        assert_eq!(largest_polygon(&parts).map(|(i, _)| i), Some(1));

        let center = visual_center(&Geometry::MultiPolygon(parts)).unwrap();
        assert!(point_in_ring(center, big.exterior()));
    }

    #[test]
    fn test_ring_area_sign_and_magnitude() {
        let ccw = square(0.0, 0.0, 10.0);
        assert_eq!(ring_area(ccw.exterior()), 100.0);
        let cw: Vec<Coord> = ccw.exterior().iter().rev().copied().collect();
        assert_eq!(ring_area(&cw), -100.0);
        assert_eq!(ring_area(&[(0.0, 0.0), (1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_degenerate_has_no_center() {
        let sliver = polygon(&[(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        assert_eq!(visual_center(&Geometry::Polygon(sliver)), None);
        assert_eq!(visual_center(&Geometry::MultiPolygon(Vec::new())), None);
        assert_eq!(visual_center(&Geometry::LineString(Vec::new())), None);
    }

    #[test]
    fn test_line_anchor_is_middle_vertex() {
        let line = Geometry::LineString(vec![(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(visual_center(&line), Some((1.0, 0.0)));
        let multi = Geometry::MultiLineString(vec![
            vec![(0.0, 0.0), (1.0, 1.0)],
            vec![(5.0, 5.0), (6.0, 5.0), (7.0, 5.0), (8.0, 5.0)],
        ]);
        assert_eq!(visual_center(&multi), Some((7.0, 5.0)));
    }

    #[test]
    fn test_bounds() {
        let point = Geometry::Point((10.0, 20.0));
        let b = bounding_box(&point).unwrap();
        assert_eq!((b.min_lon, b.max_lon, b.min_lat, b.max_lat), (9.0, 11.0, 19.0, 21.0));

        let geom = Geometry::Polygon(square(0.0, 0.0, 10.0));
        let padded = padded_bounds(&geom).unwrap();
        assert_eq!((padded.min_lon, padded.max_lon), (-1.0, 11.0));
        assert_eq!((padded.min_lat, padded.max_lat), (-1.0, 11.0));

        assert!(bounding_box(&Geometry::MultiPolygon(Vec::new())).is_none());
    }
}
