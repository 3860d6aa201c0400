use glam::DVec2;
use ratatui::style::Color;

use super::projection::Projection;
use super::style::ShapeStyle;
use crate::data::Basemap;
use crate::geo::{distinct_points, Coord, Geometry, Polygon};
use crate::surface::{FillRule, Path, Surface};

/// Display settings for map layers
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSettings {
    pub show_basemap: bool,
    pub show_labels: bool,
    /// Point marker radius in device pixels
    pub point_radius: f64,
    /// Basemap line width in device pixels
    pub basemap_width: f64,
    /// Padding around a dataset-fitted view, in canvas pixels
    pub fit_padding: f64,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            show_basemap: true,
            show_labels: true,
            point_radius: 3.0,
            basemap_width: 1.0,
            fit_padding: 16.0,
        }
    }
}

/// Draws decoded geometries and the basemap onto a [`Surface`]
#[derive(Debug, Clone, Default)]
pub struct GeometryRenderer {
    pub settings: RenderSettings,
}

impl GeometryRenderer {
    pub fn new(settings: RenderSettings) -> Self {
        Self { settings }
    }

    /// Draw one geometry. Returns how many parts were drawn; degenerate
    /// parts are skipped.
    pub fn draw<S, P>(&self, surface: &mut S, geometry: &Geometry, style: &ShapeStyle, projection: &P) -> usize
    where
        S: Surface + ?Sized,
        P: Projection + ?Sized,
    {
        // User units per device pixel, so markers and strokes keep their size under zoom
        let pixel = 1.0 / surface.transforms().scale_factor().max(f64::EPSILON);

        match geometry {
            Geometry::Point(c) => {
                self.draw_point(surface, *c, style, projection, pixel);
                1
            }
            Geometry::LineString(line) => usize::from(draw_line(surface, line, style, projection, pixel)),
            Geometry::MultiLineString(lines) => lines
                .iter()
                .filter(|line| draw_line(surface, line, style, projection, pixel))
                .count(),
            Geometry::Polygon(poly) => usize::from(draw_polygon(surface, poly, style, projection, pixel)),
            Geometry::MultiPolygon(polys) => polys
                .iter()
                .filter(|poly| draw_polygon(surface, poly, style, projection, pixel))
                .count(),
        }
    }

    fn draw_point<S, P>(&self, surface: &mut S, c: Coord, style: &ShapeStyle, projection: &P, pixel: f64)
    where
        S: Surface + ?Sized,
        P: Projection + ?Sized,
    {
        let mut path = Path::new();
        path.circle(projection.project_coord(c), self.settings.point_radius * pixel);
        surface.fill_path(&path, style.fill, FillRule::NonZero);
        surface.stroke_path(&path, style.stroke, style.stroke_width * pixel);
    }

    /// Draw basemap lines, skipping segments that jump further than
    /// `max_jump` canvas pixels (lines wrapping across the map edge)
    pub fn draw_basemap<S, P>(&self, surface: &mut S, basemap: &Basemap, color: Color, projection: &P, max_jump: f64)
    where
        S: Surface + ?Sized,
        P: Projection + ?Sized,
    {
        let pixel = 1.0 / surface.transforms().scale_factor().max(f64::EPSILON);
        let mut path = Path::new();
        for line in &basemap.lines {
            if line.len() < 2 {
                continue;
            }
            let mut prev: Option<DVec2> = None;
            for &c in line {
                let p = projection.project_coord(c);
                match prev {
                    Some(q) if (p.x - q.x).abs() < max_jump => path.line_to(p),
                    _ => path.move_to(p),
                }
                prev = Some(p);
            }
        }
        if !path.is_empty() {
            surface.stroke_path(&path, color, self.settings.basemap_width * pixel);
        }
    }
}

/// Lines are stroked only, in the style's fill color so they read as data
fn draw_line<S, P>(surface: &mut S, line: &[Coord], style: &ShapeStyle, projection: &P, pixel: f64) -> bool
where
    S: Surface + ?Sized,
    P: Projection + ?Sized,
{
    if line.len() < 2 {
        log::debug!("skipping line with {} points", line.len());
        return false;
    }
    let mut path = Path::new();
    trace_ring(&mut path, line, projection);
    surface.stroke_path(&path, style.fill, (style.stroke_width + 1.0) * pixel);
    true
}

/// One even-odd path over every ring so holes punch through, then every
/// ring stroked
fn draw_polygon<S, P>(surface: &mut S, poly: &Polygon, style: &ShapeStyle, projection: &P, pixel: f64) -> bool
where
    S: Surface + ?Sized,
    P: Projection + ?Sized,
{
    if poly.is_degenerate() {
        log::debug!("skipping degenerate polygon ({} outer points)", poly.exterior().len());
        return false;
    }

    let mut path = Path::new();
    for (i, ring) in poly.rings.iter().enumerate() {
        if i > 0 && distinct_points(ring).len() < 3 {
            log::debug!("skipping degenerate hole {}", i);
            continue;
        }
        trace_ring(&mut path, distinct_points(ring), projection);
        path.close();
    }
    surface.fill_path(&path, style.fill, FillRule::EvenOdd);
    surface.stroke_path(&path, style.stroke, style.stroke_width * pixel);
    true
}

fn trace_ring<P: Projection + ?Sized>(path: &mut Path, ring: &[Coord], projection: &P) {
    let mut points = ring.iter().map(|c| projection.project_coord(*c));
    if let Some(first) = points.next() {
        path.move_to(first);
        points.for_each(|p| path.line_to(p));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::braille::BrailleCanvas;
    use crate::map::projection::Equirectangular;
    use crate::svg::SvgSurface;

    fn style() -> ShapeStyle {
        ShapeStyle {
            fill: Color::Rgb(70, 130, 180),
            stroke: Color::White,
            stroke_width: 1.0,
        }
    }

    fn square(x: f64, y: f64, size: f64) -> Vec<Coord> {
        vec![(x, y), (x + size, y), (x + size, y + size), (x, y + size), (x, y)]
    }

    #[test]
    fn test_polygon_with_hole_is_one_even_odd_path() {
        let renderer = GeometryRenderer::default();
        let mut svg = SvgSurface::new(360.0, 180.0);
        let donut = Geometry::Polygon(Polygon::new(vec![square(0.0, 0.0, 40.0), square(10.0, 10.0, 20.0)]));
        let drawn = renderer.draw(&mut svg, &donut, &style(), &Equirectangular::new(360.0, 180.0));
        assert_eq!(drawn, 1);

        let doc = svg.to_svg();
        let fill = doc.lines().find(|l| l.contains("fill-rule=\"evenodd\"")).unwrap();
        // Both rings live in the same path element
        assert_eq!(fill.matches('M').count(), 2);
        assert_eq!(fill.matches('Z').count(), 2);
        assert_eq!(doc.matches("stroke=\"#ffffff\"").count(), 1);
    }

    #[test]
    fn test_degenerate_parts_are_skipped() {
        let renderer = GeometryRenderer::default();
        let mut svg = SvgSurface::new(360.0, 180.0);
        let multi = Geometry::MultiPolygon(vec![
            Polygon::new(vec![vec![(0.0, 0.0), (1.0, 1.0), (0.0, 0.0)]]),
            Polygon::new(vec![square(5.0, 5.0, 5.0)]),
            Polygon::new(Vec::new()),
        ]);
        assert_eq!(renderer.draw(&mut svg, &multi, &style(), &Equirectangular::new(360.0, 180.0)), 1);
        assert_eq!(
            renderer.draw(&mut svg, &Geometry::LineString(vec![(0.0, 0.0)]), &style(), &Equirectangular::new(360.0, 180.0)),
            0
        );
    }

    #[test]
    fn test_point_and_line() {
        let renderer = GeometryRenderer::default();
        let mut svg = SvgSurface::new(360.0, 180.0);
        let proj = Equirectangular::new(360.0, 180.0);
        renderer.draw(&mut svg, &Geometry::Point((0.0, 0.0)), &style(), &proj);
        renderer.draw(&mut svg, &Geometry::LineString(vec![(0.0, 0.0), (10.0, 0.0)]), &style(), &proj);

        let doc = svg.to_svg();
        assert!(doc.contains(r##"<circle cx="180.00" cy="90.00" r="3.00" fill="#4682b4"/>"##));
        assert!(doc.contains(r#"d="M180.00,90.00 L190.00,90.00" fill="none""#));
        // Lines never get a fill
        assert!(!doc.contains("fill-rule"));
    }

    #[test]
    fn test_marker_size_is_zoom_independent() {
        let renderer = GeometryRenderer::default();
        let mut svg = SvgSurface::new(360.0, 180.0);
        svg.scale(DVec2::splat(4.0));
        renderer.draw(&mut svg, &Geometry::Point((-180.0, 90.0)), &style(), &Equirectangular::new(360.0, 180.0));
        assert!(svg.to_svg().contains(r#"r="3.00""#));
    }

    #[test]
    fn test_basemap_skips_wrapping_segments() {
        let renderer = GeometryRenderer::default();
        let mut svg = SvgSurface::new(360.0, 180.0);
        let basemap = Basemap {
            lines: vec![vec![(170.0, 0.0), (179.0, 0.0), (-179.0, 0.0), (-170.0, 0.0)], vec![(0.0, 0.0)]],
        };
        renderer.draw_basemap(&mut svg, &basemap, Color::Cyan, &Equirectangular::new(360.0, 180.0), 180.0);
        let doc = svg.to_svg();
        assert!(doc.contains("M350.00,90.00 L359.00,90.00 M1.00,90.00 L10.00,90.00"));
    }

    #[test]
    fn test_braille_fill_lands_in_cells() {
        let renderer = GeometryRenderer::default();
        let mut canvas = BrailleCanvas::new(36, 9);
        let proj = Equirectangular::new(72.0, 36.0);
        let block = Geometry::Polygon(Polygon::new(vec![square(-20.0, -20.0, 40.0)]));
        renderer.draw(&mut canvas, &block, &style(), &proj);
        // Square spans canvas pixels x 32..40, y 14..22
        assert!(canvas.cell(16, 4).is_some());
        assert_eq!(canvas.cell(0, 0), None);
    }
}
