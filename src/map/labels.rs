use glam::DVec2;
use ratatui::style::Color;

use super::projection::Projection;
use crate::geo::{self, Coord, Geometry};
use crate::surface::Surface;

/// Candidate vertical offsets in pixels, tried in order (up before down)
const OFFSETS: [f64; 7] = [0.0, -10.0, 10.0, -20.0, 20.0, -30.0, 30.0];

/// Label text styling
#[derive(Debug, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_size: f64,
    /// Sub-text font size as a fraction of `font_size`
    pub sub_font_ratio: f64,
    /// Vertical gap between main and sub-text
    pub line_gap: f64,
    pub halo_width: f64,
    pub halo_color: Color,
    pub text_color: Color,
    pub sub_text_color: Color,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            sub_font_ratio: 0.8,
            line_gap: 2.0,
            halo_width: 3.0,
            halo_color: Color::Rgb(16, 16, 24),
            text_color: Color::White,
            sub_text_color: Color::Rgb(200, 200, 200),
        }
    }
}

/// A placed label in canvas pixel space; (x, y) is the top-left corner
#[derive(Debug, Clone, PartialEq)]
pub struct LabelBox {
    pub text: String,
    pub sub_text: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub priority: f64,
}

impl LabelBox {
    /// Strict AABB overlap; boxes that only touch don't collide
    pub fn overlaps(&self, other: &LabelBox) -> bool {
        self.x < other.x + other.width
            && self.x + self.width > other.x
            && self.y < other.y + other.height
            && self.y + self.height > other.y
    }

    pub fn center(&self) -> DVec2 {
        DVec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Where a label wants to sit
#[derive(Debug, Clone, Copy)]
pub enum Anchor<'a> {
    /// Visual center of a geometry
    Geometry(&'a Geometry),
    /// Raw coordinates of a row without usable geometry
    Point { lat: f64, lon: f64 },
}

impl Anchor<'_> {
    pub fn resolve(&self) -> Option<Coord> {
        match self {
            Anchor::Geometry(geometry) => geo::visual_center(geometry),
            Anchor::Point { lat, lon } => (lat.is_finite() && lon.is_finite()).then_some((*lon, *lat)),
        }
    }
}

/// One label to place
#[derive(Debug, Clone, Copy)]
pub struct LabelRequest<'a> {
    pub anchor: Anchor<'a>,
    pub text: &'a str,
    pub sub_text: Option<&'a str>,
    pub priority: f64,
}

/// Why a label was not drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LabelSkip {
    #[error("no anchor available")]
    AnchorUnavailable,

    #[error("anchor projects outside the canvas")]
    OffCanvas,

    #[error("no collision-free position")]
    CollisionExhausted,
}

/// Label engine for one render pass
#[derive(Debug, Default)]
pub struct LabelPlacer {
    style: LabelStyle,
    placed: Vec<LabelBox>,
    dropped: usize,
}

impl LabelPlacer {
    pub fn new(style: LabelStyle) -> Self {
        Self {
            style,
            placed: Vec::new(),
            dropped: 0,
        }
    }

    /// Forget every placed label; call at the top of each full render
    pub fn reset(&mut self) {
        self.placed.clear();
        self.dropped = 0;
    }

    pub fn style(&self) -> &LabelStyle {
        &self.style
    }

    pub fn placed(&self) -> &[LabelBox] {
        &self.placed
    }

    /// Labels that collided everywhere since the last reset
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Place and draw a label. Returns false if it was dropped.
    pub fn place_label<S, P>(
        &mut self,
        surface: &mut S,
        projection: &P,
        request: LabelRequest<'_>,
        canvas_w: f64,
        canvas_h: f64,
    ) -> bool
    where
        S: Surface + ?Sized,
        P: Projection + ?Sized,
    {
        match self.try_place_label(surface, projection, request, canvas_w, canvas_h) {
            Ok(_) => true,
            Err(skip) => {
                log::trace!("label {:?} skipped: {}", request.text, skip);
                false
            }
        }
    }

    pub fn try_place_label<S, P>(
        &mut self,
        surface: &mut S,
        projection: &P,
        request: LabelRequest<'_>,
        canvas_w: f64,
        canvas_h: f64,
    ) -> Result<LabelBox, LabelSkip>
    where
        S: Surface + ?Sized,
        P: Projection + ?Sized,
    {
        let anchor = request.anchor.resolve().ok_or(LabelSkip::AnchorUnavailable)?;
        let at = projection.project_coord(anchor);
        if !(0.0..=canvas_w).contains(&at.x) || !(0.0..=canvas_h).contains(&at.y) {
            return Err(LabelSkip::OffCanvas);
        }

        let sub_font = self.style.font_size * self.style.sub_font_ratio;
        let main_size = surface.measure_text(request.text, self.style.font_size);
        let sub_size = request.sub_text.map(|s| surface.measure_text(s, sub_font));
        let width = sub_size.map_or(main_size.x, |s| main_size.x.max(s.x));
        let height = sub_size.map_or(main_size.y, |s| main_size.y + self.style.line_gap + s.y);

        let mut candidate = LabelBox {
            text: request.text.to_string(),
            sub_text: request.sub_text.map(str::to_string),
            x: at.x - width / 2.0,
            y: at.y - height / 2.0,
            width,
            height,
            priority: request.priority,
        };
        let base_y = candidate.y;

        let free = OFFSETS.iter().any(|offset| {
            candidate.y = base_y + offset;
            !self.placed.iter().any(|b| b.overlaps(&candidate))
        });
        if !free {
            self.dropped += 1;
            return Err(LabelSkip::CollisionExhausted);
        }

        self.draw(surface, &candidate, main_size.y, sub_font);
        self.placed.push(candidate.clone());
        Ok(candidate)
    }

    /// Halo first, then fill, so text stays legible on any background
    fn draw<S: Surface + ?Sized>(&self, surface: &mut S, label: &LabelBox, main_height: f64, sub_font: f64) {
        let style = &self.style;
        let cx = label.x + label.width / 2.0;
        let main_center = DVec2::new(cx, label.y + main_height / 2.0);
        surface.stroke_text(&label.text, main_center, style.font_size, style.halo_color, style.halo_width);
        surface.fill_text(&label.text, main_center, style.font_size, style.text_color);

        if let Some(sub) = &label.sub_text {
            let sub_height = label.height - main_height - style.line_gap;
            let sub_center = DVec2::new(cx, label.y + main_height + style.line_gap + sub_height / 2.0);
            surface.stroke_text(sub, sub_center, sub_font, style.halo_color, style.halo_width * style.sub_font_ratio);
            surface.fill_text(sub, sub_center, sub_font, style.sub_text_color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::Polygon;
    use crate::map::projection::Equirectangular;
    use crate::svg::SvgSurface;

    fn request<'a>(lat: f64, lon: f64, text: &'a str) -> LabelRequest<'a> {
        LabelRequest {
            anchor: Anchor::Point { lat, lon },
            text,
            sub_text: None,
            priority: 0.0,
        }
    }

    fn setup() -> (LabelPlacer, SvgSurface, Equirectangular) {
        (
            LabelPlacer::new(LabelStyle::default()),
            SvgSurface::new(360.0, 180.0),
            Equirectangular::new(360.0, 180.0),
        )
    }

    #[test]
    fn test_single_label_centered_on_anchor() {
        let (mut placer, mut svg, proj) = setup();
        let label = placer
            .try_place_label(&mut svg, &proj, request(0.0, 0.0, "Test"), 360.0, 180.0)
            .unwrap();
        assert!((label.center() - DVec2::new(180.0, 90.0)).length() < 1e-9);
        assert_eq!(placer.placed().len(), 1);
        let doc = svg.to_svg();
        // Halo is drawn before the fill
        let halo = doc.find("stroke-width=\"3.00\"").unwrap();
        let fill = doc.rfind(">Test</text>").unwrap();
        assert!(halo < fill);
    }

    #[test]
    fn test_vertical_offset_search_then_drop() {
        let (mut placer, mut svg, proj) = setup();
        let labels: Vec<_> = (0..4)
            .map(|_| placer.try_place_label(&mut svg, &proj, request(0.0, 0.0, "Same"), 360.0, 180.0))
            .collect();

        let base_y = labels[0].as_ref().unwrap().y;
        // 12px tall boxes: ±10 still collides, ±20 is clear
        assert_eq!(labels[1].as_ref().unwrap().y, base_y - 20.0);
        assert_eq!(labels[2].as_ref().unwrap().y, base_y + 20.0);
        assert_eq!(labels[3], Err(LabelSkip::CollisionExhausted));
        assert_eq!(placer.dropped(), 1);
        assert_eq!(placer.placed().len(), 3);
    }

    #[test]
    fn test_off_canvas_and_missing_anchor() {
        let (mut placer, mut svg, proj) = setup();
        let far = placer.try_place_label(&mut svg, &proj, request(0.0, 190.0, "Far"), 360.0, 180.0);
        assert_eq!(far, Err(LabelSkip::OffCanvas));

        let degenerate = Geometry::Polygon(Polygon::new(vec![vec![(0.0, 0.0), (1.0, 1.0)]]));
        let req = LabelRequest {
            anchor: Anchor::Geometry(&degenerate),
            text: "Nothing",
            sub_text: None,
            priority: 1.0,
        };
        assert!(!placer.place_label(&mut svg, &proj, req, 360.0, 180.0));
        let nan = placer.try_place_label(&mut svg, &proj, request(f64::NAN, 0.0, "NaN"), 360.0, 180.0);
        assert_eq!(nan, Err(LabelSkip::AnchorUnavailable));
        assert!(placer.placed().is_empty());
    }

    #[test]
    fn test_sub_text_extends_box() {
        let (mut placer, mut svg, proj) = setup();
        let req = LabelRequest {
            anchor: Anchor::Point { lat: 10.0, lon: 10.0 },
            text: "Fiji",
            sub_text: Some("GDP 5.5B"),
            priority: 1.0,
        };
        let label = placer.try_place_label(&mut svg, &proj, req, 360.0, 180.0).unwrap();
        // Sub-text at 80% size is wider than the main line here
        assert!((label.width - 8.0 * 9.6 * 0.6).abs() < 1e-9);
        assert!((label.height - (12.0 + 2.0 + 9.6)).abs() < 1e-9);
        assert!(svg.to_svg().contains(">GDP 5.5B</text>"));
    }

    #[test]
    fn test_accepted_labels_never_overlap() {
        let (mut placer, mut svg, proj) = setup();
        let mut seed: u64 = 42;
        let mut next = || {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            (seed >> 11) as f64 / (1u64 << 53) as f64
        };
        for i in 0..200 {
            let lon = next() * 100.0 - 50.0;
            let lat = next() * 60.0 - 30.0;
            let name = format!("Item {}", i);
            placer.place_label(&mut svg, &proj, request(lat, lon, &name), 360.0, 180.0);
        }

        let placed = placer.placed();
        assert!(placed.len() >= 5);
        assert!(placer.dropped() > 0);
        for (i, a) in placed.iter().enumerate() {
            for b in &placed[i + 1..] {
                assert!(!a.overlaps(b), "{:?} overlaps {:?}", a, b);
            }
        }

        placer.reset();
        assert!(placer.placed().is_empty());
        assert_eq!(placer.dropped(), 0);
    }
}
