use crate::data::{AttrValue, Attributes, RowItem};
use crate::geo::{self, analysis, Bounds, Coord, Geometry};

use super::style::MapMode;

/// A result row prepared for drawing. Built once per data arrival so redraws
/// never decode.
#[derive(Debug, Clone, PartialEq)]
pub struct MapItem {
    pub id: String,
    pub name: String,
    /// Decoded and seam-normalized geometry
    pub geometry: Option<Geometry>,
    /// Label and hit-test anchor as (lon, lat), in the geometry's frame
    pub anchor: Option<Coord>,
    /// Copy of the geometry one turn over, when part of it lies past ±180°
    pub wrapped: Option<Geometry>,
    /// Longitude offset from `geometry` to `wrapped`
    pub wrap_shift: f64,
    pub attributes: Attributes,
    /// Outer-ring area in square degrees, 0 for points and lines
    pub area: f64,
}

impl MapItem {
    pub fn prepare(row: &RowItem) -> Self {
        let geometry = match row.decode_geometry() {
            Ok(geometry) => geometry.map(|g| geo::normalize(&g)),
            Err(e) => {
                log::warn!("row {}: {}, falling back to point coordinates", row.id, e);
                None
            }
        };
        let anchor = geometry.as_ref().and_then(geo::visual_center).or_else(|| row.point());
        if anchor.is_none() {
            log::debug!("row {} has no usable location", row.id);
        }

        let wrap_shift = geometry.as_ref().map_or(0.0, wrap_shift);
        let wrapped = geometry
            .as_ref()
            .filter(|_| wrap_shift != 0.0)
            .map(|g| geo::shift_lon(g, wrap_shift));

        Self {
            id: row.id.clone(),
            name: row.name.clone().unwrap_or_else(|| row.id.clone()),
            area: geometry.as_ref().map_or(0.0, analysis::polygon_area),
            geometry,
            anchor,
            wrapped,
            wrap_shift,
            attributes: row.attributes.clone(),
        }
    }

    /// Anchor positions, preferred first. With `world` set this includes
    /// the anchor of the wrapped copy.
    pub fn anchors(&self, world: bool) -> impl Iterator<Item = Coord> {
        let twin = match (world, &self.wrapped, self.anchor) {
            (true, Some(_), Some((lon, lat))) => Some((lon + self.wrap_shift, lat)),
            _ => None,
        };
        self.anchor.into_iter().chain(twin)
    }

    /// Label priority in `mode`: the mode's value, else polygon area, else
    /// population
    pub fn priority(&self, mode: MapMode) -> f64 {
        mode.value(&self.attributes)
            .or_else(|| (self.area > 0.0).then_some(self.area))
            .or_else(|| self.attributes.get("population").and_then(AttrValue::as_f64))
            .unwrap_or(0.0)
    }

    /// Short type description for the info box
    pub fn kind(&self) -> &'static str {
        self.geometry.as_ref().map_or("Point", Geometry::kind)
    }
}

pub fn prepare_items(rows: &[RowItem]) -> Vec<MapItem> {
    let items: Vec<MapItem> = rows.iter().map(MapItem::prepare).collect();
    log::debug!(
        "prepared {} items, {} with geometry",
        items.len(),
        items.iter().filter(|i| i.geometry.is_some()).count()
    );
    items
}

/// Whole turn that brings the part of a geometry beyond ±180° back on the map
fn wrap_shift(geometry: &Geometry) -> f64 {
    match Bounds::of_coords(geometry.coords()) {
        Some(b) if b.max_lon > 180.0 => -360.0,
        Some(b) if b.min_lon < -180.0 => 360.0,
        _ => 0.0,
    }
}
