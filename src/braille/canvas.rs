use glam::DVec2;
use ratatui::style::Color;

use super::raster;
use crate::surface::{FillRule, Path, SubPath, Surface, TransformStack};

/// Stroke widths at or above this draw the thick Bresenham variant
const THICK_STROKE: f64 = 1.5;

/// Braille Unicode canvas for high-resolution terminal graphics.
/// Each character cell represents a 2x4 pixel grid (8 dots).
/// Unicode Braille patterns: U+2800 to U+28FF
///
/// Cells carry the color of the last thing drawn into them, and a text
/// overlay sits on top of the dots.
pub struct BrailleCanvas {
    width: usize,  // Characters
    height: usize, // Characters
    pixels: Vec<Vec<u8>>, // Bit patterns per char
    colors: Vec<Vec<Color>>,
    text: Vec<Vec<Option<(char, Color)>>>,
    background: Color,
    transforms: TransformStack,
}

impl BrailleCanvas {
    /// Create a new canvas with the given character dimensions.
    /// Effective pixel resolution: width*2 x height*4
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![vec![0u8; width]; height],
            colors: vec![vec![Color::Reset; width]; height],
            text: vec![vec![None; width]; height],
            background: Color::Reset,
            transforms: TransformStack::default(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn background(&self) -> Color {
        self.background
    }

    /// Set a pixel at the given coordinates.
    /// Braille dot layout per character:
    /// ```text
    /// (0,0) (1,0)   bits: 0x01 0x08
    /// (0,1) (1,1)   bits: 0x02 0x10
    /// (0,2) (1,2)   bits: 0x04 0x20
    /// (0,3) (1,3)   bits: 0x40 0x80
    /// ```
    pub fn set_pixel(&mut self, x: usize, y: usize, color: Color) {
        let cx = x / 2;
        let cy = y / 4;

        if cx >= self.width || cy >= self.height {
            return;
        }

        let bit = match (x % 2, y % 4) {
            (0, 0) => 0x01,
            (1, 0) => 0x08,
            (0, 1) => 0x02,
            (1, 1) => 0x10,
            (0, 2) => 0x04,
            (1, 2) => 0x20,
            (0, 3) => 0x40,
            (1, 3) => 0x80,
            _ => 0,
        };

        self.pixels[cy][cx] |= bit;
        self.colors[cy][cx] = color;
    }

    /// Set a pixel using signed coordinates (ignores negative values)
    pub fn set_pixel_signed(&mut self, x: i32, y: i32, color: Color) {
        if x >= 0 && y >= 0 {
            self.set_pixel(x as usize, y as usize, color);
        }
    }

    /// What to show in a character cell: overlay text wins over dots
    pub fn cell(&self, col: usize, row: usize) -> Option<(char, Color)> {
        if col >= self.width || row >= self.height {
            return None;
        }
        if let Some(glyph) = self.text[row][col] {
            return Some(glyph);
        }
        match self.pixels[row][col] {
            0 => None,
            bits => Some((braille_char(bits), self.colors[row][col])),
        }
    }

    /// Get a specific row as a string (dots and overlay text)
    pub fn row_to_string(&self, row: usize) -> String {
        if row >= self.height {
            return String::new();
        }
        (0..self.width)
            .map(|col| self.cell(col, row).map(|(c, _)| c).unwrap_or('\u{2800}'))
            .collect()
    }

    /// Get all rows as an iterator of strings
    pub fn rows(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.height).map(|i| self.row_to_string(i))
    }

    /// Convert the canvas to a string of Braille characters
    #[cfg(test)]
    pub fn to_string(&self) -> String {
        self.rows().collect::<Vec<_>>().join("\n")
    }

    fn device_polylines(&self, path: &Path) -> Vec<(Vec<DVec2>, bool)> {
        path.subpaths()
            .iter()
            .map(|sub| match sub {
                SubPath::Polyline { points, closed } => (
                    points.iter().map(|p| self.transforms.to_device(*p)).collect(),
                    *closed,
                ),
                SubPath::Circle { center, radius } => (self.device_circle(*center, *radius), true),
            })
            .collect()
    }

    /// Circle approximated as a polygon in device space
    fn device_circle(&self, center: DVec2, radius: f64) -> Vec<DVec2> {
        let c = self.transforms.to_device(center);
        let r = radius * self.transforms.scale_factor();
        let segments = ((r * 4.0).ceil() as usize).clamp(8, 64);
        (0..segments)
            .map(|i| {
                let angle = i as f64 / segments as f64 * std::f64::consts::TAU;
                c + DVec2::new(angle.cos(), angle.sin()) * r
            })
            .collect()
    }

    /// Character cells covered by centered text: (first column, row, length)
    fn text_cells(&self, text: &str, center: DVec2) -> (i32, i32, i32) {
        let device = self.transforms.to_device(center);
        let len = text.chars().count() as i32;
        // Far off-canvas text must not overflow the cell arithmetic below
        let limit = (self.width.max(self.height) + 2 * len as usize) as f64;
        let col = (device.x / 2.0 - len as f64 / 2.0).round().clamp(-limit, limit) as i32;
        let row = (device.y / 4.0).floor().clamp(-limit, limit) as i32;
        (col, row, len)
    }

    fn cell_index(&self, col: i32, row: i32) -> Option<(usize, usize)> {
        (col >= 0 && row >= 0 && (col as usize) < self.width && (row as usize) < self.height)
            .then_some((col as usize, row as usize))
    }
}

/// Braille glyph for a dot bit pattern
fn braille_char(bits: u8) -> char {
    char::from_u32(0x2800 + bits as u32).unwrap_or(' ')
}

impl Surface for BrailleCanvas {
    fn size(&self) -> DVec2 {
        DVec2::new(self.width as f64 * 2.0, self.height as f64 * 4.0)
    }

    fn transforms(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    fn clear(&mut self, background: Color) {
        for row in &mut self.pixels {
            row.fill(0);
        }
        for row in &mut self.colors {
            row.fill(Color::Reset);
        }
        for row in &mut self.text {
            row.fill(None);
        }
        self.background = background;
        self.transforms.reset();
    }

    /// Fills are stippled so strokes drawn on top stay readable
    fn fill_path(&mut self, path: &Path, color: Color, rule: FillRule) {
        let rings: Vec<Vec<DVec2>> = self
            .device_polylines(path)
            .into_iter()
            .map(|(points, _)| points)
            .collect();
        let (width, height) = (self.width as i32 * 2, self.height as i32 * 4);
        let mut dots = Vec::new();
        raster::fill_rings(&rings, rule, width, height, |x, y| {
            if (x + y) % 2 == 0 {
                dots.push((x, y));
            }
        });
        for (x, y) in dots {
            self.set_pixel_signed(x, y, color);
        }
    }

    fn stroke_path(&mut self, path: &Path, color: Color, width: f64) {
        let width = width * self.transforms.scale_factor();
        // Thick lines also plot one dot right and down
        let max = self.size() - DVec2::splat(if width >= THICK_STROKE { 2.0 } else { 1.0 });
        let mut dots = Vec::new();
        for (points, closed) in self.device_polylines(path) {
            let mut plot = |x, y| dots.push((x, y));
            if points.len() == 1 {
                let p = points[0].round();
                if p.is_finite() && p.x >= 0.0 && p.y >= 0.0 && p.x <= max.x && p.y <= max.y {
                    plot(p.x as i32, p.y as i32);
                }
                continue;
            }
            let segments = if closed { points.len() } else { points.len().saturating_sub(1) };
            for i in 0..segments {
                let Some((a, b)) = raster::clip_segment(points[i], points[(i + 1) % points.len()], max) else {
                    continue;
                };
                let (a, b) = (a.round(), b.round());
                let (x0, y0, x1, y1) = (a.x as i32, a.y as i32, b.x as i32, b.y as i32);
                if width >= THICK_STROKE {
                    raster::thick_line(x0, y0, x1, y1, &mut plot);
                } else {
                    raster::line(x0, y0, x1, y1, &mut plot);
                }
            }
        }
        for (x, y) in dots {
            self.set_pixel_signed(x, y, color);
        }
    }

    /// Glyphs occupy one cell (2x4 dots) regardless of font size
    fn measure_text(&self, text: &str, _font_size: f64) -> DVec2 {
        let scale = self.transforms.scale_factor().max(f64::EPSILON);
        DVec2::new(text.chars().count() as f64 * 2.0, 4.0) / scale
    }

    fn fill_text(&mut self, text: &str, center: DVec2, _font_size: f64, color: Color) {
        let (col, row, _) = self.text_cells(text, center);
        for (i, ch) in text.chars().enumerate() {
            if let Some((c, r)) = self.cell_index(col + i as i32, row) {
                self.text[r][c] = Some((ch, color));
            }
        }
    }

    /// The halo knocks out dots under the text and one cell either side
    fn stroke_text(&mut self, text: &str, center: DVec2, _font_size: f64, _color: Color, width: f64) {
        let (col, row, len) = self.text_cells(text, center);
        let margin = if width > 0.0 { 1 } else { 0 };
        for c in (col - margin)..(col + len + margin) {
            if let Some((c, r)) = self.cell_index(c, row) {
                self.pixels[r][c] = 0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_pixel() {
        let mut canvas = BrailleCanvas::new(1, 1);
        canvas.set_pixel(0, 0, Color::White);
        assert_eq!(canvas.to_string(), "⠁"); // U+2801
    }

    #[test]
    fn test_all_dots() {
        let mut canvas = BrailleCanvas::new(1, 1);
        // Set all 8 dots
        for x in 0..2 {
            for y in 0..4 {
                canvas.set_pixel(x, y, Color::White);
            }
        }
        assert_eq!(canvas.to_string(), "⣿"); // U+28FF (all dots)
    }

    #[test]
    fn test_diagonal() {
        let mut canvas = BrailleCanvas::new(2, 1);
        canvas.set_pixel(0, 0, Color::White);
        canvas.set_pixel(1, 1, Color::White);
        canvas.set_pixel(2, 2, Color::White);
        canvas.set_pixel(3, 3, Color::White);
        // First char: (0,0) and (1,1) = 0x01 | 0x10 = 0x11
        // Second char: (0,2) and (1,3) = 0x04 | 0x80 = 0x84
        assert_eq!(canvas.to_string(), "⠑⢄");
    }

    #[test]
    fn test_stroke_uses_transform() {
        let mut canvas = BrailleCanvas::new(4, 1);
        canvas.translate(DVec2::new(2.0, 0.0));
        let mut path = Path::new();
        path.move_to(DVec2::new(0.0, 0.0));
        path.line_to(DVec2::new(1.0, 0.0));
        canvas.stroke_path(&path, Color::Yellow, 1.0);
        assert_eq!(canvas.cell(0, 0), None);
        assert_eq!(canvas.cell(1, 0), Some(('⠉', Color::Yellow)));
    }

    #[test]
    fn test_far_off_canvas_geometry_is_clipped() {
        let mut canvas = BrailleCanvas::new(4, 2);
        let mut path = Path::new();
        path.move_to(DVec2::new(-1e12, 2.0));
        path.line_to(DVec2::new(1e12, 2.0));
        path.move_to(DVec2::new(3e9, 3e9));
        path.line_to(DVec2::new(-3e9, 3e9));
        canvas.stroke_path(&path, Color::White, 2.0);
        // The horizontal line crosses every cell of the top row, the other misses
        assert!((0..4).all(|col| canvas.cell(col, 0).is_some()));
        assert!((0..4).all(|col| canvas.cell(col, 1).is_none()));

        let mut block = Path::new();
        block.rect(DVec2::splat(-1e15), DVec2::splat(2e15));
        canvas.fill_path(&block, Color::Green, FillRule::NonZero);
        assert!(canvas.cell(3, 1).is_some());

        canvas.fill_text("far", DVec2::new(1e300, -1e300), 12.0, Color::White);
        canvas.stroke_text("far", DVec2::new(-1e300, 1e300), 12.0, Color::Black, 3.0);
        assert!(!canvas.rows().any(|row| row.contains("far")));
    }

    #[test]
    fn test_fill_is_stippled_and_keeps_holes() {
        let mut canvas = BrailleCanvas::new(10, 5);
        let mut path = Path::new();
        path.rect(DVec2::ZERO, DVec2::new(20.0, 20.0));
        path.rect(DVec2::new(4.0, 4.0), DVec2::new(12.0, 12.0));
        canvas.fill_path(&path, Color::Green, FillRule::EvenOdd);

        // Outer corner cell filled with a checkerboard of dots
        let (ch, color) = canvas.cell(0, 0).expect("corner filled");
        assert_eq!(color, Color::Green);
        assert_eq!(ch as u32 - 0x2800, 0x01 | 0x04 | 0x10 | 0x80);
        // Cell fully inside the hole stays empty
        assert_eq!(canvas.cell(4, 2), None);
    }

    #[test]
    fn test_text_overlay_and_halo() {
        let mut canvas = BrailleCanvas::new(10, 2);
        let mut path = Path::new();
        path.rect(DVec2::ZERO, DVec2::new(20.0, 8.0));
        canvas.fill_path(&path, Color::Blue, FillRule::NonZero);

        let center = DVec2::new(10.0, 1.0);
        assert_eq!(canvas.measure_text("abc", 12.0), DVec2::new(6.0, 4.0));
        canvas.stroke_text("abc", center, 12.0, Color::Black, 3.0);
        canvas.fill_text("abc", center, 12.0, Color::White);

        let row = canvas.row_to_string(0);
        assert!(row.contains("abc"), "row was {:?}", row);
        // Halo cells either side of the text are knocked out
        let start = row.find("abc").map(|i| row[..i].chars().count()).unwrap();
        assert_eq!(canvas.cell(start - 1, 0), None);
        assert_eq!(canvas.cell(start + 3, 0), None);
        // Second row untouched by the halo
        assert!(canvas.cell(0, 1).is_some());
    }
}
