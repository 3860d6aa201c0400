use geozero::wkb::{Ewkb, Wkb};
use geozero::{CoordDimensions, ToGeo, ToWkb};

use super::{Coord, Geometry, Polygon, Ring};

/// EWKB type word flags (SRID present, Z, M)
const EWKB_FLAGS: u32 = 0x2000_0000 | 0x8000_0000 | 0x4000_0000;

/// Errors produced while turning a geometry blob into a [`Geometry`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum DecodeError {
    #[error("empty geometry blob")]
    Empty,

    #[error("invalid hex at offset {0}")]
    InvalidHex(usize),

    #[error("WKB decode error: {0}")]
    Wkb(String),

    #[error("WKB encode error: {0}")]
    Encode(String),

    #[error("unsupported geometry type: {0}")]
    Unsupported(&'static str),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

/// Decode a geometry blob: raw WKB/EWKB bytes or hex text with an optional
/// `\x` / `0x` prefix.
pub fn decode(blob: &[u8]) -> Result<Geometry> {
    let bytes = unwrap_envelope(blob)?;
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }

    let geometry = if is_ewkb(&bytes) {
        Ewkb(bytes).to_geo()
    } else {
        Wkb(bytes).to_geo()
    }
    .map_err(|e| DecodeError::Wkb(e.to_string()))?;

    from_geo_types(geometry)
}

/// Encode a geometry as OGC WKB (XY only)
pub fn encode(geometry: &Geometry) -> Result<Vec<u8>> {
    to_geo_types(geometry)
        .to_wkb(CoordDimensions::xy())
        .map_err(|e| DecodeError::Encode(e.to_string()))
}

/// Encode a geometry as upper-case hex WKB text, as PostGIS prints it
pub fn to_hex(geometry: &Geometry) -> Result<String> {
    let bytes = encode(geometry)?;
    Ok(bytes.iter().map(|b| format!("{:02X}", b)).collect())
}

/// Strip a hex envelope if there is one, otherwise pass raw bytes through
fn unwrap_envelope(blob: &[u8]) -> Result<Vec<u8>> {
    let trimmed = blob.trim_ascii();
    let hex = if let Some(rest) = trimmed.strip_prefix(b"\\x") {
        Some(rest)
    } else if let Some(rest) = trimmed
        .strip_prefix(b"0x")
        .or_else(|| trimmed.strip_prefix(b"0X"))
    {
        Some(rest)
    } else if looks_like_bare_hex(trimmed) {
        Some(trimmed)
    } else {
        None
    };

    match hex {
        Some(text) => decode_hex(text),
        None => Ok(trimmed.to_vec()),
    }
}

/// Bare hex WKB always starts with a byte order marker "00" or "01"
fn looks_like_bare_hex(text: &[u8]) -> bool {
    text.len() >= 10
        && text.len() % 2 == 0
        && (text.starts_with(b"00") || text.starts_with(b"01"))
        && text.iter().all(u8::is_ascii_hexdigit)
}

fn decode_hex(text: &[u8]) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(DecodeError::InvalidHex(text.len()));
    }
    text.chunks_exact(2)
        .enumerate()
        .map(|(i, pair)| match (hex_value(pair[0]), hex_value(pair[1])) {
            (Some(hi), Some(lo)) => Ok(hi << 4 | lo),
            (None, _) => Err(DecodeError::InvalidHex(i * 2)),
            (_, None) => Err(DecodeError::InvalidHex(i * 2 + 1)),
        })
        .collect()
}

#[inline(always)]
fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Check the type word for PostGIS extension flags
fn is_ewkb(bytes: &[u8]) -> bool {
    if bytes.len() < 5 {
        return false;
    }
    let word = [bytes[1], bytes[2], bytes[3], bytes[4]];
    let type_word = match bytes[0] {
        0 => u32::from_be_bytes(word),
        _ => u32::from_le_bytes(word),
    };
    type_word & EWKB_FLAGS != 0
}

fn ring_from(line: &geo_types::LineString<f64>) -> Ring {
    line.coords().map(|c| (c.x, c.y)).collect()
}

fn polygon_from(poly: &geo_types::Polygon<f64>) -> Polygon {
    let mut rings = Vec::with_capacity(1 + poly.interiors().len());
    rings.push(ring_from(poly.exterior()));
    rings.extend(poly.interiors().iter().map(ring_from));
    Polygon::new(rings)
}

fn from_geo_types(geometry: geo_types::Geometry<f64>) -> Result<Geometry> {
    use geo_types::Geometry as G;

    match geometry {
        G::Point(p) => Ok(Geometry::Point((p.x(), p.y()))),
        G::Line(line) => Ok(Geometry::LineString(vec![
            (line.start.x, line.start.y),
            (line.end.x, line.end.y),
        ])),
        G::LineString(line) => Ok(Geometry::LineString(ring_from(&line))),
        G::Polygon(poly) => Ok(Geometry::Polygon(polygon_from(&poly))),
        G::MultiLineString(lines) => Ok(Geometry::MultiLineString(
            lines.0.iter().map(ring_from).collect(),
        )),
        G::MultiPolygon(polys) => Ok(Geometry::MultiPolygon(
            polys.0.iter().map(polygon_from).collect(),
        )),
        G::Rect(rect) => Ok(Geometry::Polygon(polygon_from(&rect.to_polygon()))),
        G::Triangle(tri) => Ok(Geometry::Polygon(polygon_from(&tri.to_polygon()))),
        G::MultiPoint(points) if points.0.len() == 1 => {
            let p = points.0[0];
            Ok(Geometry::Point((p.x(), p.y())))
        }
        G::MultiPoint(_) => Err(DecodeError::Unsupported("MultiPoint")),
        G::GeometryCollection(mut collection) if collection.0.len() == 1 => {
            from_geo_types(collection.0.remove(0))
        }
        G::GeometryCollection(_) => Err(DecodeError::Unsupported("GeometryCollection")),
    }
}

fn line_to(ring: &[Coord]) -> geo_types::LineString<f64> {
    geo_types::LineString::from(ring.to_vec())
}

fn polygon_to(poly: &Polygon) -> geo_types::Polygon<f64> {
    geo_types::Polygon::new(
        line_to(poly.exterior()),
        poly.holes().iter().map(|h| line_to(h)).collect(),
    )
}

fn to_geo_types(geometry: &Geometry) -> geo_types::Geometry<f64> {
    use geo_types::Geometry as G;

    match geometry {
        Geometry::Point((x, y)) => G::Point(geo_types::Point::new(*x, *y)),
        Geometry::LineString(line) => G::LineString(line_to(line)),
        Geometry::Polygon(poly) => G::Polygon(polygon_to(poly)),
        Geometry::MultiLineString(lines) => G::MultiLineString(geo_types::MultiLineString::new(
            lines.iter().map(|l| line_to(l)).collect(),
        )),
        Geometry::MultiPolygon(polys) => G::MultiPolygon(geo_types::MultiPolygon::new(
            polys.iter().map(polygon_to).collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUARE_HEX: &str = "010300000001000000050000000000000000000000000000000000000000000000000010400000000000000000000000000000104000000000000010400000000000000000000000000000104000000000000000000000000000000000";

    fn assert_coords_eq(a: &[Coord], b: &[Coord]) {
        assert_eq!(a.len(), b.len());
        for (p, q) in a.iter().zip(b) {
            assert!((p.0 - q.0).abs() < 1e-9 && (p.1 - q.1).abs() < 1e-9, "{:?} != {:?}", p, q);
        }
    }

    fn ring(points: &[(f64, f64)]) -> Ring {
        points.to_vec()
    }

    #[test]
    fn test_decode_polygon_hex_prefixes() {
        let expected = vec![(0.0, 0.0), (4.0, 0.0), (4.0, 4.0), (0.0, 4.0), (0.0, 0.0)];
        for text in [
            SQUARE_HEX.to_string(),
            format!("0x{}", SQUARE_HEX),
            format!("\\x{}", SQUARE_HEX),
            format!("  0X{}\n", SQUARE_HEX.to_lowercase()),
        ] {
            match decode(text.as_bytes()) {
                Ok(Geometry::Polygon(poly)) => {
                    assert_eq!(poly.rings.len(), 1);
                    assert_coords_eq(poly.exterior(), &expected);
                }
                other => panic!("Expected Polygon for {:?}, got {:?}", text, other),
            }
        }
    }

    #[test]
    fn test_polygon_with_hole_round_trip() {
        let original = Geometry::Polygon(Polygon::new(vec![
            ring(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)]),
            ring(&[(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0), (2.0, 2.0)]),
        ]));
        let bytes = encode(&original).expect("encode should succeed");
        let restored = decode(&bytes).expect("decode should succeed");

        match (&original, &restored) {
            (Geometry::Polygon(a), Geometry::Polygon(b)) => {
                assert_eq!(a.rings.len(), b.rings.len());
                for (ra, rb) in a.rings.iter().zip(&b.rings) {
                    assert_coords_eq(ra, rb);
                }
            }
            _ => panic!("Expected Polygon, got {:?}", restored),
        }
    }

    #[test]
    fn test_multipolygon_round_trip_through_hex() {
        let original = Geometry::MultiPolygon(vec![
            Polygon::new(vec![ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)])]),
            Polygon::new(vec![ring(&[
                (178.5, -17.0),
                (-179.5, -17.0),
                (-179.5, -16.0),
                (178.5, -16.0),
                (178.5, -17.0),
            ])]),
        ]);
        let hex = to_hex(&original).expect("encode should succeed");
        let restored = decode(format!("\\x{}", hex).as_bytes()).expect("decode should succeed");

        match restored {
            Geometry::MultiPolygon(parts) => {
                assert_eq!(parts.len(), 2);
                assert_coords_eq(parts[1].exterior(), &original_parts(&original)[1]);
            }
            other => panic!("Expected MultiPolygon, got {:?}", other),
        }
    }

    fn original_parts(geom: &Geometry) -> Vec<Ring> {
        match geom {
            Geometry::MultiPolygon(parts) => parts.iter().map(|p| p.exterior().to_vec()).collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_point_and_lines_round_trip() {
        let point = Geometry::Point((151.2, -33.9));
        assert_eq!(decode(&encode(&point).unwrap()).unwrap(), point);

        let river = Geometry::LineString(ring(&[(115.8, -31.9), (116.0, -31.8), (116.1, -31.6)]));
        match decode(&encode(&river).unwrap()).unwrap() {
            Geometry::LineString(line) => assert_coords_eq(&line, &ring(&[(115.8, -31.9), (116.0, -31.8), (116.1, -31.6)])),
            other => panic!("Expected LineString, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_ewkb_with_srid() {
        // SRID=4326;POINT(1 2), little endian, point type with SRID flag
        let hex = "0101000020E6100000000000000000F03F0000000000000040";
        assert_eq!(decode(hex.as_bytes()), Ok(Geometry::Point((1.0, 2.0))));
    }

    #[test]
    fn test_truncated_buffer_is_error() {
        let bytes = encode(&Geometry::Point((1.0, 2.0))).unwrap();
        let result = decode(&bytes[..bytes.len() - 4]);
        assert!(matches!(result, Err(DecodeError::Wkb(_))), "got {:?}", result);
    }

    #[test]
    fn test_bad_hex_is_error() {
        assert_eq!(decode(b"\\x01zz"), Err(DecodeError::InvalidHex(2)));
        assert_eq!(decode(b"0x010"), Err(DecodeError::InvalidHex(3)));
        assert_eq!(decode(b"0x"), Err(DecodeError::Empty));
        assert_eq!(decode(b""), Err(DecodeError::Empty));
    }

    #[test]
    fn test_unknown_type_tag_is_error() {
        // Little endian, type 99
        let mut bytes = vec![1u8];
        bytes.extend_from_slice(&99u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 16]);
        assert!(decode(&bytes).is_err());
    }
}
