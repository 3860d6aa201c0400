pub mod analysis;
pub mod antimeridian;
pub mod wkb;

pub use analysis::{bounding_box, padded_bounds, visual_center, Bounds};
pub use antimeridian::{normalize, shift_lon};
pub use wkb::{decode, DecodeError};

/// A geographic coordinate as (lon, lat) in degrees
pub type Coord = (f64, f64);

/// A ring or line: sequence of (lon, lat) coordinates
pub type Ring = Vec<Coord>;

/// Polygon with an outer boundary and optional holes.
/// `rings[0]` is the outer ring, `rings[1..]` are holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub rings: Vec<Ring>,
}

impl Polygon {
    pub fn new(rings: Vec<Ring>) -> Self {
        Self { rings }
    }

    /// Outer boundary (empty slice for a polygon without rings)
    pub fn exterior(&self) -> &[Coord] {
        self.rings.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn holes(&self) -> &[Ring] {
        self.rings.get(1..).unwrap_or(&[])
    }

    /// Outer ring with fewer than 3 distinct points can't be filled or labeled
    pub fn is_degenerate(&self) -> bool {
        distinct_points(self.exterior()).len() < 3
    }
}

/// Geometry model produced by the decoders and consumed by the renderers
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coord),
    LineString(Ring),
    Polygon(Polygon),
    MultiLineString(Vec<Ring>),
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    /// Short type name for log messages
    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    /// Iterate every coordinate of every part and ring
    pub fn coords(&self) -> Box<dyn Iterator<Item = Coord> + '_> {
        match self {
            Geometry::Point(c) => Box::new(std::iter::once(*c)),
            Geometry::LineString(line) => Box::new(line.iter().copied()),
            Geometry::Polygon(poly) => Box::new(poly.rings.iter().flatten().copied()),
            Geometry::MultiLineString(lines) => Box::new(lines.iter().flatten().copied()),
            Geometry::MultiPolygon(polys) => {
                Box::new(polys.iter().flat_map(|p| p.rings.iter().flatten().copied()))
            }
        }
    }

    /// Number of polygon parts (0 for points and lines)
    pub fn polygon_count(&self) -> usize {
        match self {
            Geometry::Polygon(_) => 1,
            Geometry::MultiPolygon(polys) => polys.len(),
            _ => 0,
        }
    }
}

/// Ring points without the closing duplicate of the first point
pub fn distinct_points(ring: &[Coord]) -> &[Coord] {
    match (ring.first(), ring.last()) {
        (Some(first), Some(last)) if ring.len() > 1 && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Polygon {
        Polygon::new(vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]])
    }

    #[test]
    fn test_distinct_points_drops_closing_point() {
        let poly = square();
        assert_eq!(distinct_points(poly.exterior()).len(), 4);
        assert_eq!(distinct_points(&[(1.0, 1.0)]).len(), 1);
        assert!(distinct_points(&[]).is_empty());
    }

    #[test]
    fn test_degenerate_polygon() {
        assert!(!square().is_degenerate());
        let sliver = Polygon::new(vec![vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]]);
        assert!(sliver.is_degenerate());
        assert!(Polygon::default().is_degenerate());
    }

    #[test]
    fn test_coords_walks_all_parts() {
        let mut with_hole = square();
        with_hole.rings.push(vec![(2.0, 2.0), (3.0, 2.0), (3.0, 3.0), (2.0, 2.0)]);
        let geom = Geometry::MultiPolygon(vec![with_hole, square()]);
        assert_eq!(geom.coords().count(), 14);
        assert_eq!(geom.polygon_count(), 2);
        assert_eq!(geom.kind(), "MultiPolygon");
    }
}
