use std::fmt::Write;

use glam::DVec2;
use ratatui::style::Color;

use crate::surface::{color_hex, FillRule, Path, SubPath, Surface, TransformStack};

/// Average glyph advance as a fraction of the font size
const GLYPH_ADVANCE: f64 = 0.6;

pub struct SvgSurface {
    width: f64,
    height: f64,
    background: Option<Color>,
    body: String,
    transforms: TransformStack,
}

impl SvgSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            background: None,
            body: String::new(),
            transforms: TransformStack::default(),
        }
    }

    /// Finished SVG document
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        if let Some(bg) = self.background {
            let _ = writeln!(out, r#"<rect width="100%" height="100%" fill="{}"/>"#, color_hex(bg));
        }
        out.push_str(&self.body);
        out.push_str("</svg>\n");
        out
    }

    /// Path data plus the circles, which SVG draws with their own element
    fn path_data(&self, path: &Path) -> (String, Vec<(DVec2, f64)>) {
        let mut d = String::new();
        let mut circles = Vec::new();
        for sub in path.subpaths() {
            match sub {
                SubPath::Polyline { points, closed } => {
                    for (i, p) in points.iter().enumerate() {
                        let p = self.transforms.to_device(*p);
                        let cmd = if i == 0 { 'M' } else { 'L' };
                        let _ = write!(d, "{}{:.2},{:.2} ", cmd, p.x, p.y);
                    }
                    if *closed {
                        d.push_str("Z ");
                    }
                }
                SubPath::Circle { center, radius } => circles.push((
                    self.transforms.to_device(*center),
                    radius * self.transforms.scale_factor(),
                )),
            }
        }
        (d.trim_end().to_string(), circles)
    }

    fn text_element(&mut self, text: &str, center: DVec2, font_size: f64, paint: &str) {
        let p = self.transforms.to_device(center);
        let size = font_size * self.transforms.scale_factor();
        let _ = writeln!(
            self.body,
            r#"<text x="{:.2}" y="{:.2}" font-size="{:.2}" font-family="sans-serif" text-anchor="middle" dominant-baseline="central" {}>{}</text>"#,
            p.x,
            p.y,
            size,
            paint,
            escape(text)
        );
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

impl Surface for SvgSurface {
    fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    fn transforms(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    fn clear(&mut self, background: Color) {
        self.body.clear();
        self.background = Some(background);
        self.transforms.reset();
    }

    fn fill_path(&mut self, path: &Path, color: Color, rule: FillRule) {
        let (d, circles) = self.path_data(path);
        let fill = color_hex(color);
        if !d.is_empty() {
            let rule = match rule {
                FillRule::EvenOdd => "evenodd",
                FillRule::NonZero => "nonzero",
            };
            let _ = writeln!(self.body, r#"<path d="{}" fill="{}" fill-rule="{}" stroke="none"/>"#, d, fill, rule);
        }
        for (c, r) in circles {
            let _ = writeln!(self.body, r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="{}"/>"#, c.x, c.y, r, fill);
        }
    }

    fn stroke_path(&mut self, path: &Path, color: Color, width: f64) {
        let (d, circles) = self.path_data(path);
        let stroke = color_hex(color);
        let width = width * self.transforms.scale_factor();
        if !d.is_empty() {
            let _ = writeln!(
                self.body,
                r#"<path d="{}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-linejoin="round"/>"#,
                d, stroke, width
            );
        }
        for (c, r) in circles {
            let _ = writeln!(
                self.body,
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="none" stroke="{}" stroke-width="{:.2}"/>"#,
                c.x, c.y, r, stroke, width
            );
        }
    }

    fn measure_text(&self, text: &str, font_size: f64) -> DVec2 {
        DVec2::new(text.chars().count() as f64 * font_size * GLYPH_ADVANCE, font_size)
    }

    fn fill_text(&mut self, text: &str, center: DVec2, font_size: f64, color: Color) {
        let paint = format!(r#"fill="{}""#, color_hex(color));
        self.text_element(text, center, font_size, &paint);
    }

    fn stroke_text(&mut self, text: &str, center: DVec2, font_size: f64, color: Color, width: f64) {
        let width = width * self.transforms.scale_factor();
        let paint = format!(
            r#"fill="none" stroke="{}" stroke-width="{:.2}" stroke-linejoin="round" paint-order="stroke""#,
            color_hex(color),
            width
        );
        self.text_element(text, center, font_size, &paint);
    }
}
