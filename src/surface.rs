use glam::{DAffine2, DVec2};
use ratatui::style::Color;

/// Fill rule for paths with several sub-paths (polygon holes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillRule {
    EvenOdd,
    NonZero,
}

/// One piece of a [`Path`]
#[derive(Debug, Clone, PartialEq)]
pub enum SubPath {
    Polyline { points: Vec<DVec2>, closed: bool },
    Circle { center: DVec2, radius: f64 },
}

/// A path made of polylines and circles, in user space
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    subpaths: Vec<SubPath>,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new open sub-path
    pub fn move_to(&mut self, p: DVec2) {
        self.subpaths.push(SubPath::Polyline {
            points: vec![p],
            closed: false,
        });
    }

    /// Extend the current sub-path; starts one if there is none
    pub fn line_to(&mut self, p: DVec2) {
        match self.subpaths.last_mut() {
            Some(SubPath::Polyline { points, closed: false }) => points.push(p),
            _ => self.move_to(p),
        }
    }

    /// Close the current sub-path back to its first point
    pub fn close(&mut self) {
        if let Some(SubPath::Polyline { closed, .. }) = self.subpaths.last_mut() {
            *closed = true;
        }
    }

    pub fn circle(&mut self, center: DVec2, radius: f64) {
        self.subpaths.push(SubPath::Circle { center, radius });
    }

    /// Axis-aligned rectangle as a closed sub-path
    pub fn rect(&mut self, min: DVec2, size: DVec2) {
        self.move_to(min);
        self.line_to(DVec2::new(min.x + size.x, min.y));
        self.line_to(min + size);
        self.line_to(DVec2::new(min.x, min.y + size.y));
        self.close();
    }

    pub fn subpaths(&self) -> &[SubPath] {
        &self.subpaths
    }

    pub fn is_empty(&self) -> bool {
        self.subpaths.is_empty()
    }
}

/// Canvas-style save/restore stack of affine transforms
#[derive(Debug, Clone)]
pub struct TransformStack {
    current: DAffine2,
    saved: Vec<DAffine2>,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self {
            current: DAffine2::IDENTITY,
            saved: Vec::new(),
        }
    }
}

impl TransformStack {
    pub fn current(&self) -> DAffine2 {
        self.current
    }

    pub fn save(&mut self) {
        self.saved.push(self.current);
    }

    /// Pop the last saved transform; unbalanced restores are ignored
    pub fn restore(&mut self) {
        if let Some(t) = self.saved.pop() {
            self.current = t;
        }
    }

    /// Post-multiply, so the new transform applies to user coordinates first
    pub fn apply(&mut self, t: DAffine2) {
        self.current = self.current * t;
    }

    pub fn reset(&mut self) {
        self.current = DAffine2::IDENTITY;
        self.saved.clear();
    }

    /// Uniform scale factor of the current transform
    pub fn scale_factor(&self) -> f64 {
        self.current.matrix2.determinant().abs().sqrt()
    }

    pub fn to_device(&self, p: DVec2) -> DVec2 {
        self.current.transform_point2(p)
    }
}

/// A 2D drawing target
pub trait Surface {
    /// Logical size in pixels
    fn size(&self) -> DVec2;

    fn transforms(&mut self) -> &mut TransformStack;

    /// Erase everything and reset the transform stack
    fn clear(&mut self, background: Color);

    fn fill_path(&mut self, path: &Path, color: Color, rule: FillRule);

    fn stroke_path(&mut self, path: &Path, color: Color, width: f64);

    /// Size of `text` in user space
    fn measure_text(&self, text: &str, font_size: f64) -> DVec2;

    fn fill_text(&mut self, text: &str, center: DVec2, font_size: f64, color: Color);

    /// Outline `text`, used to draw a halo under [`Surface::fill_text`]
    fn stroke_text(&mut self, text: &str, center: DVec2, font_size: f64, color: Color, width: f64);

    fn save(&mut self) {
        self.transforms().save();
    }

    fn restore(&mut self) {
        self.transforms().restore();
    }

    fn translate(&mut self, offset: DVec2) {
        self.transforms().apply(DAffine2::from_translation(offset));
    }

    fn scale(&mut self, factor: DVec2) {
        self.transforms().apply(DAffine2::from_scale(factor));
    }

    fn transform(&mut self, t: DAffine2) {
        self.transforms().apply(t);
    }
}

/// `#rrggbb` form of a color, for text-based backends
pub fn color_hex(color: Color) -> String {
    let (r, g, b) = match color {
        Color::Rgb(r, g, b) => (r, g, b),
        Color::Black => (0, 0, 0),
        Color::Red => (205, 49, 49),
        Color::Green => (13, 188, 121),
        Color::Yellow => (229, 229, 16),
        Color::Blue => (36, 114, 200),
        Color::Magenta => (188, 63, 188),
        Color::Cyan => (17, 168, 205),
        Color::Gray => (204, 204, 204),
        Color::DarkGray => (102, 102, 102),
        Color::LightRed => (241, 76, 76),
        Color::LightGreen => (35, 209, 139),
        Color::LightYellow => (245, 245, 67),
        Color::LightBlue => (59, 142, 234),
        Color::LightMagenta => (214, 112, 214),
        Color::LightCyan => (41, 184, 219),
        Color::White => (255, 255, 255),
        Color::Indexed(i) => (i, i, i),
        Color::Reset => (128, 128, 128),
    };
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_builder() {
        let mut path = Path::new();
        path.move_to(DVec2::new(0.0, 0.0));
        path.line_to(DVec2::new(1.0, 0.0));
        path.line_to(DVec2::new(1.0, 1.0));
        path.close();
        path.line_to(DVec2::new(5.0, 5.0));
        path.circle(DVec2::ZERO, 2.0);

        assert_eq!(path.subpaths().len(), 3);
        assert!(matches!(&path.subpaths()[0], SubPath::Polyline { points, closed: true } if points.len() == 3));
        assert!(matches!(&path.subpaths()[1], SubPath::Polyline { points, closed: false } if points.len() == 1));
    }

    #[test]
    fn test_transform_stack_save_restore() {
        let mut stack = TransformStack::default();
        stack.save();
        stack.apply(DAffine2::from_translation(DVec2::new(10.0, 0.0)));
        stack.apply(DAffine2::from_scale(DVec2::splat(2.0)));
        assert_eq!(stack.to_device(DVec2::new(1.0, 1.0)), DVec2::new(12.0, 2.0));
        assert_eq!(stack.scale_factor(), 2.0);
        stack.restore();
        assert_eq!(stack.to_device(DVec2::new(1.0, 1.0)), DVec2::new(1.0, 1.0));
        stack.restore();
        assert_eq!(stack.current(), DAffine2::IDENTITY);
    }

    #[test]
    fn test_color_hex() {
        assert_eq!(color_hex(Color::Rgb(255, 0, 16)), "#ff0010");
        assert_eq!(color_hex(Color::White), "#ffffff");
    }
}
