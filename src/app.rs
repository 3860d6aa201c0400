use anyhow::{Context, Result};
use glam::DVec2;
use std::fs;
use std::path::PathBuf;

use geoquery_map::braille::BrailleCanvas;
use geoquery_map::data::{Basemap, RowItem};
use geoquery_map::map::{ControllerConfig, LabelStyle, MapController, Palette, RenderSettings};
use geoquery_map::svg::SvgSurface;

/// Where `e` writes the current view
pub const EXPORT_PATH: &str = "geoquery-map.svg";

/// SVG export resolution relative to the Braille pixel grid
const EXPORT_SCALE: f64 = 4.0;

/// Application state
pub struct App {
    pub controller: MapController,
    /// Braille canvas the map is rendered into every frame
    pub canvas: BrailleCanvas,
    pub should_quit: bool,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Outcome of the last export, shown in the status bar
    pub message: Option<String>,
    /// Rows file name, or "demo"
    pub source: String,
}

/// Braille canvas cells for a terminal size.
/// Account for border (2 chars horizontal, 2 chars vertical) plus the status bar.
fn canvas_cells(width: usize, height: usize) -> (usize, usize) {
    (width.saturating_sub(2), height.saturating_sub(3))
}

/// Logical canvas size in Braille pixels (2x4 per cell)
fn canvas_pixels(cols: usize, rows: usize) -> DVec2 {
    DVec2::new(cols as f64 * 2.0, rows as f64 * 4.0)
}

impl App {
    pub fn new(width: usize, height: usize, rows: &[RowItem], basemap: Basemap, source: String) -> Self {
        let (cols, lines) = canvas_cells(width, height);
        let mut controller = MapController::new(
            ControllerConfig::default(),
            RenderSettings::default(),
            Palette::default(),
            LabelStyle::default(),
            canvas_pixels(cols, lines),
        );
        controller.set_rows(rows);
        controller.set_basemap(basemap);

        Self {
            controller,
            canvas: BrailleCanvas::new(cols, lines),
            should_quit: false,
            mouse_pos: None,
            message: None,
            source,
        }
    }

    /// Update canvas size when terminal resizes
    pub fn resize(&mut self, width: usize, height: usize) {
        let (cols, lines) = canvas_cells(width, height);
        if cols != self.canvas.width() || lines != self.canvas.height() {
            self.canvas = BrailleCanvas::new(cols, lines);
            self.controller.set_canvas_size(canvas_pixels(cols, lines));
        }
    }

    /// Re-render the map into the Braille canvas
    pub fn redraw(&mut self) {
        self.controller.render(&mut self.canvas);
    }

    /// Move the view by a Braille pixel offset
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.controller.pan_by(DVec2::new(-dx as f64, -dy as f64));
    }

    pub fn zoom_in(&mut self) {
        self.controller.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.controller.zoom_out();
    }

    pub fn reset(&mut self) {
        self.controller.reset();
        self.message = None;
    }

    pub fn cycle_mode(&mut self) {
        self.controller.cycle_mode();
    }

    pub fn toggle_labels(&mut self) {
        let settings = self.controller.settings_mut();
        settings.show_labels = !settings.show_labels;
    }

    pub fn toggle_basemap(&mut self) {
        let settings = self.controller.settings_mut();
        settings.show_basemap = !settings.show_basemap;
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Convert terminal coords to Braille pixel coords.
    /// Each terminal cell is 2 Braille pixels wide, 4 tall; the border adds a
    /// 1 cell offset.
    pub fn mouse_to_canvas(col: u16, row: u16) -> DVec2 {
        DVec2::new(
            (col.saturating_sub(1)) as f64 * 2.0,
            (row.saturating_sub(1)) as f64 * 4.0,
        )
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.controller.pointer_down(Self::mouse_to_canvas(col, row));
    }

    pub fn mouse_drag(&mut self, col: u16, row: u16) {
        self.controller.pointer_move(Self::mouse_to_canvas(col, row));
    }

    pub fn mouse_up(&mut self, col: u16, row: u16) {
        self.controller.pointer_up(Self::mouse_to_canvas(col, row));
    }

    /// Update mouse cursor position
    pub fn set_mouse_pos(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    /// Write the current view as SVG and report the outcome in the status bar
    pub fn export(&mut self) {
        self.message = Some(match self.export_svg() {
            Ok(path) => format!("saved {}", path.display()),
            Err(e) => {
                log::error!("export failed: {:#}", e);
                format!("export failed: {}", e)
            }
        });
    }

    fn export_svg(&mut self) -> Result<PathBuf> {
        let size = self.controller.canvas_size() * EXPORT_SCALE;
        let mut svg = SvgSurface::new(size.x, size.y);
        let stats = self.controller.render(&mut svg);
        let path = PathBuf::from(EXPORT_PATH);
        fs::write(&path, svg.to_svg()).with_context(|| format!("writing {}", path.display()))?;
        log::info!("exported {} ({} shapes, {} labels)", path.display(), stats.shapes, stats.labels_placed);
        // Stats should describe the terminal view again
        self.redraw();
        Ok(path)
    }

    /// Get current zoom level as a string
    pub fn zoom_level(&self) -> String {
        format!("{:.1}x", self.controller.state().zoom)
    }

    /// Name of the selected item, if any
    pub fn selection(&self) -> Option<&str> {
        self.controller.selected_item().map(|item| item.name.as_str())
    }
}
