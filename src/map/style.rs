use ratatui::style::Color;
use std::collections::HashMap;

use crate::data::{AttrValue, Attributes};

/// How query results are colored and labeled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MapMode {
    /// Graduated by area; the view fits the dataset
    Area,
    /// Categorical by continent
    Countries,
    /// Graduated by GDP, value shown under the name
    Economy,
    /// Categorical by terrain class
    Terrain,
    #[default]
    General,
}

impl MapMode {
    pub const ALL: [MapMode; 5] = [
        MapMode::General,
        MapMode::Area,
        MapMode::Countries,
        MapMode::Economy,
        MapMode::Terrain,
    ];

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn name(self) -> &'static str {
        match self {
            MapMode::Area => "area",
            MapMode::Countries => "countries",
            MapMode::Economy => "economy",
            MapMode::Terrain => "terrain",
            MapMode::General => "general",
        }
    }

    /// Attribute keys of the graduated value, first present wins
    pub fn value_keys(self) -> &'static [&'static str] {
        match self {
            MapMode::Area => &["area_km2", "area"],
            MapMode::Economy => &["gdp"],
            _ => &[],
        }
    }

    /// Attribute key of the categorical fill
    pub fn category_key(self) -> Option<&'static str> {
        match self {
            MapMode::Countries => Some("continent"),
            MapMode::Terrain => Some("terrain"),
            _ => None,
        }
    }

    /// Whether the view fits the dataset instead of showing the world
    pub fn fits_dataset(self) -> bool {
        self == MapMode::Area
    }

    /// Graduated value of a row in this mode
    pub fn value(self, attributes: &Attributes) -> Option<f64> {
        self.value_keys()
            .iter()
            .find_map(|key| attributes.get(*key).and_then(AttrValue::as_f64))
    }

    /// Line shown under the label in this mode
    pub fn sub_text(self, attributes: &Attributes) -> Option<String> {
        match self {
            MapMode::Economy => self.value(attributes).map(|gdp| format!("${}", format_compact(gdp))),
            _ => None,
        }
    }
}

/// 1234 -> "1.2K", 5.5e9 -> "5.5B"
pub fn format_compact(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in UNITS {
        if value.abs() >= scale {
            return format!("{:.1}{}", value / scale, suffix);
        }
    }
    format!("{:.0}", value)
}

/// Min/max of a graduated attribute across the dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().filter(|v| v.is_finite()).fold(None, |range, v| {
            Some(match range {
                None => ValueRange { min: v, max: v },
                Some(r) => ValueRange {
                    min: r.min.min(v),
                    max: r.max.max(v),
                },
            })
        })
    }

    /// Position of `value` in the range as 0..=1. Positive ranges use a log
    /// scale since areas and GDPs span orders of magnitude.
    pub fn normalize(&self, value: f64) -> f64 {
        let (lo, hi, v) = if self.min > 0.0 {
            (self.min.ln(), self.max.ln(), value.max(self.min).ln())
        } else {
            (self.min, self.max, value)
        };
        if hi - lo <= f64::EPSILON {
            return 1.0;
        }
        ((v - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Paint for one shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeStyle {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f64,
}

/// Color tables, built once at startup and handed to the controller
#[derive(Debug, Clone)]
pub struct Palette {
    /// Lower-case continent name to fill
    pub continents: HashMap<String, Color>,
    /// Lower-case terrain class to fill
    pub terrain: HashMap<String, Color>,
    /// Graduated ramp, low to high
    pub ramp: Vec<Color>,
    pub general: Color,
    /// Fill for rows missing the mode's attribute
    pub unknown: Color,
    pub outline: Color,
    pub selected: Color,
    pub basemap: Color,
    pub background: Color,
    pub overlay: Color,
    pub overlay_text: Color,
}

impl Default for Palette {
    fn default() -> Self {
        let table = |entries: &[(&str, Color)]| -> HashMap<String, Color> {
            entries.iter().map(|(k, c)| (k.to_string(), *c)).collect()
        };
        Self {
            continents: table(&[
                ("africa", Color::Rgb(230, 159, 0)),
                ("asia", Color::Rgb(213, 94, 0)),
                ("europe", Color::Rgb(0, 114, 178)),
                ("north america", Color::Rgb(0, 158, 115)),
                ("south america", Color::Rgb(240, 228, 66)),
                ("oceania", Color::Rgb(86, 180, 233)),
                ("antarctica", Color::Rgb(220, 220, 230)),
            ]),
            terrain: table(&[
                ("mountain", Color::Rgb(139, 90, 43)),
                ("plateau", Color::Rgb(205, 133, 63)),
                ("hills", Color::Rgb(189, 183, 107)),
                ("plain", Color::Rgb(124, 205, 124)),
                ("basin", Color::Rgb(102, 170, 136)),
                ("desert", Color::Rgb(238, 214, 175)),
                ("forest", Color::Rgb(34, 139, 34)),
                ("wetland", Color::Rgb(72, 160, 200)),
            ]),
            ramp: vec![
                Color::Rgb(255, 255, 178),
                Color::Rgb(254, 204, 92),
                Color::Rgb(253, 141, 60),
                Color::Rgb(240, 59, 32),
                Color::Rgb(189, 0, 38),
            ],
            general: Color::Rgb(70, 130, 180),
            unknown: Color::DarkGray,
            outline: Color::White,
            selected: Color::Yellow,
            basemap: Color::Cyan,
            background: Color::Reset,
            overlay: Color::Rgb(24, 24, 32),
            overlay_text: Color::White,
        }
    }
}

impl Palette {
    pub fn continent(&self, name: &str) -> Color {
        self.continents
            .get(&name.trim().to_lowercase())
            .copied()
            .unwrap_or(self.unknown)
    }

    pub fn terrain(&self, class: &str) -> Color {
        self.terrain
            .get(&class.trim().to_lowercase())
            .copied()
            .unwrap_or(self.unknown)
    }

    /// Ramp color for a 0..=1 position
    pub fn ramp_color(&self, t: f64) -> Color {
        if self.ramp.is_empty() {
            return self.general;
        }
        let last = self.ramp.len() - 1;
        let i = (t.clamp(0.0, 1.0) * last as f64).round() as usize;
        self.ramp[i.min(last)]
    }

    /// Fill for a row's attributes in `mode`
    pub fn fill(&self, mode: MapMode, attributes: &Attributes, range: Option<ValueRange>) -> Color {
        if let Some(key) = mode.category_key() {
            return match attributes.get(key).and_then(AttrValue::as_str) {
                Some(name) if key == "continent" => self.continent(name),
                Some(class) => self.terrain(class),
                None => self.unknown,
            };
        }
        if mode.value_keys().is_empty() {
            return self.general;
        }
        match (mode.value(attributes), range) {
            (Some(v), Some(range)) => self.ramp_color(range.normalize(v)),
            _ => self.unknown,
        }
    }

    pub fn shape_style(
        &self,
        mode: MapMode,
        attributes: &Attributes,
        range: Option<ValueRange>,
        selected: bool,
    ) -> ShapeStyle {
        ShapeStyle {
            fill: self.fill(mode, attributes, range),
            stroke: if selected { self.selected } else { self.outline },
            stroke_width: if selected { 2.0 } else { 1.0 },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, AttrValue)]) -> Attributes {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_mode_cycle_visits_all() {
        let mut mode = MapMode::default();
        let mut seen = vec![mode];
        for _ in 0..4 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(mode.next(), MapMode::default());
        for m in MapMode::ALL {
            assert!(seen.contains(&m));
        }
    }

    #[test]
    fn test_value_lookup_order() {
        let both = attrs(&[("area", AttrValue::Number(5.0)), ("area_km2", AttrValue::Number(9.0))]);
        assert_eq!(MapMode::Area.value(&both), Some(9.0));
        let fallback = attrs(&[("area", AttrValue::Text("12".to_string()))]);
        assert_eq!(MapMode::Area.value(&fallback), Some(12.0));
        assert_eq!(MapMode::General.value(&both), None);
    }

    #[test]
    fn test_categorical_fills() {
        let palette = Palette::default();
        let row = attrs(&[
            ("continent", AttrValue::Text("Europe".to_string())),
            ("terrain", AttrValue::Text("Desert".to_string())),
        ]);
        assert_eq!(palette.fill(MapMode::Countries, &row, None), Color::Rgb(0, 114, 178));
        assert_eq!(palette.fill(MapMode::Terrain, &row, None), Color::Rgb(238, 214, 175));
        assert_eq!(palette.fill(MapMode::General, &row, None), palette.general);
        assert_eq!(palette.fill(MapMode::Countries, &Attributes::new(), None), palette.unknown);
        assert_eq!(palette.continent("Atlantis"), palette.unknown);
    }

    #[test]
    fn test_graduated_ramp() {
        let palette = Palette::default();
        let range = ValueRange::of([1e3, 1e6, 1e9]).unwrap();
        assert_eq!(range.normalize(1e3), 0.0);
        assert!((range.normalize(1e6) - 0.5).abs() < 1e-9);
        assert_eq!(range.normalize(1e9), 1.0);

        let high = attrs(&[("gdp", AttrValue::Number(1e9))]);
        let low = attrs(&[("gdp", AttrValue::Number(1e3))]);
        assert_eq!(palette.fill(MapMode::Economy, &high, Some(range)), palette.ramp[4]);
        assert_eq!(palette.fill(MapMode::Economy, &low, Some(range)), palette.ramp[0]);

        let single = ValueRange::of([7.0]).unwrap();
        assert_eq!(single.normalize(7.0), 1.0);
        assert!(ValueRange::of([f64::NAN]).is_none());
    }

    #[test]
    fn test_economy_sub_text() {
        let row = attrs(&[("gdp", AttrValue::Number(5.5e9))]);
        assert_eq!(MapMode::Economy.sub_text(&row).as_deref(), Some("$5.5B"));
        assert_eq!(MapMode::Area.sub_text(&row), None);
        assert_eq!(format_compact(950.0), "950");
        assert_eq!(format_compact(1_340_000.0), "1.3M");
    }
}
