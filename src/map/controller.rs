use glam::DVec2;

use super::item::{prepare_items, MapItem};
use super::labels::{Anchor, LabelPlacer, LabelRequest, LabelStyle};
use super::projection::{fit_dataset, Equirectangular, FitTransform, Projection, ViewTransform};
use super::renderer::{GeometryRenderer, RenderSettings};
use super::style::{format_compact, MapMode, Palette, ValueRange};
use crate::data::{Basemap, RowItem};
use crate::geo::Geometry;
use crate::surface::{FillRule, Path, Surface};

/// Interaction tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerConfig {
    /// Zoom factor per step
    pub zoom_step: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Pointer travel below this many pixels counts as a click
    pub click_slop: f64,
    /// Max distance in pixels from a click to an item anchor
    pub hit_radius: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            zoom_step: 1.2,
            min_zoom: 0.5,
            max_zoom: 5.0,
            click_slop: 3.0,
            hit_radius: 18.0,
        }
    }
}

/// Zoom, pan and selection
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    pub selected: Option<String>,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            selected: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Gesture {
    Idle,
    Panning { last: DVec2, travelled: f64 },
}

/// The projection in effect for the current mode
#[derive(Debug, Clone)]
pub enum ActiveProjection {
    World(Equirectangular),
    Fit(FitTransform),
}

impl ActiveProjection {
    /// The world view repeats shapes one turn over; a fitted view doesn't
    pub fn wraps(&self) -> bool {
        matches!(self, ActiveProjection::World(_))
    }
}

impl Projection for ActiveProjection {
    fn project(&self, lon: f64, lat: f64) -> DVec2 {
        match self {
            ActiveProjection::World(p) => p.project(lon, lat),
            ActiveProjection::Fit(p) => p.project(lon, lat),
        }
    }
}

/// Counters from the last redraw
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub shapes: usize,
    pub labels_placed: usize,
    pub labels_dropped: usize,
}

pub struct MapController {
    config: ControllerConfig,
    renderer: GeometryRenderer,
    palette: Palette,
    placer: LabelPlacer,
    state: ViewportState,
    gesture: Gesture,
    mode: MapMode,
    items: Vec<MapItem>,
    basemap: Basemap,
    /// Logical canvas size; pointer positions use the same units
    canvas_size: DVec2,
    stats: RenderStats,
}

impl MapController {
    pub fn new(
        config: ControllerConfig,
        settings: RenderSettings,
        palette: Palette,
        label_style: LabelStyle,
        canvas_size: DVec2,
    ) -> Self {
        Self {
            config,
            renderer: GeometryRenderer::new(settings),
            palette,
            placer: LabelPlacer::new(label_style),
            state: ViewportState::default(),
            gesture: Gesture::Idle,
            mode: MapMode::default(),
            items: Vec::new(),
            basemap: Basemap::default(),
            canvas_size,
            stats: RenderStats::default(),
        }
    }

    /// Replace the dataset. Rows are decoded here, once.
    pub fn set_rows(&mut self, rows: &[RowItem]) {
        self.items = prepare_items(rows);
        if let Some(id) = &self.state.selected {
            if !self.items.iter().any(|i| &i.id == id) {
                self.state.selected = None;
            }
        }
    }

    pub fn items(&self) -> &[MapItem] {
        &self.items
    }

    pub fn set_basemap(&mut self, basemap: Basemap) {
        self.basemap = basemap;
    }

    pub fn set_canvas_size(&mut self, size: DVec2) {
        self.canvas_size = size;
    }

    pub fn canvas_size(&self) -> DVec2 {
        self.canvas_size
    }

    pub fn mode(&self) -> MapMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: MapMode) {
        log::debug!("mode {} -> {}", self.mode.name(), mode.name());
        self.mode = mode;
    }

    pub fn cycle_mode(&mut self) {
        self.set_mode(self.mode.next());
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.renderer.settings
    }

    pub fn settings_mut(&mut self) -> &mut RenderSettings {
        &mut self.renderer.settings
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.state.zoom * self.config.zoom_step);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.state.zoom / self.config.zoom_step);
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.state.zoom = zoom.clamp(self.config.min_zoom, self.config.max_zoom);
    }

    /// Back to the identity view with nothing selected
    pub fn reset(&mut self) {
        self.state = ViewportState::default();
        self.gesture = Gesture::Idle;
    }

    /// Pan by a screen-space delta
    pub fn pan_by(&mut self, delta: DVec2) {
        self.state.pan_x += delta.x / self.state.zoom;
        self.state.pan_y += delta.y / self.state.zoom;
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    pub fn pointer_down(&mut self, pos: DVec2) {
        self.gesture = Gesture::Panning {
            last: pos,
            travelled: 0.0,
        };
    }

    pub fn pointer_move(&mut self, pos: DVec2) {
        if let Gesture::Panning { last, travelled } = self.gesture {
            let delta = pos - last;
            self.gesture = Gesture::Panning {
                last: pos,
                travelled: travelled + delta.length(),
            };
            self.pan_by(delta);
        }
    }

    /// Ends a pan. A release that barely moved is a click; returns whether
    /// one happened.
    pub fn pointer_up(&mut self, pos: DVec2) -> bool {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Panning { last, travelled } if travelled + (pos - last).length() < self.config.click_slop => {
                self.click(pos);
                true
            }
            _ => false,
        }
    }

    pub fn pointer_leave(&mut self) {
        self.gesture = Gesture::Idle;
    }

    /// One finger mirrors the mouse; more cancel the gesture
    pub fn touch_start(&mut self, touches: &[DVec2]) {
        match touches {
            [one] => self.pointer_down(*one),
            _ => self.pointer_leave(),
        }
    }

    pub fn touch_move(&mut self, touches: &[DVec2]) {
        match touches {
            [one] => self.pointer_move(*one),
            _ => self.pointer_leave(),
        }
    }

    /// `lifted` are the touches that ended
    pub fn touch_end(&mut self, lifted: &[DVec2]) -> bool {
        match lifted {
            [one] => self.pointer_up(*one),
            _ => {
                self.pointer_leave();
                false
            }
        }
    }

    /// Select the item nearest to `screen`, or clear the selection
    pub fn click(&mut self, screen: DVec2) -> Option<&MapItem> {
        let hit = self.hit_test(screen).map(|item| item.id.clone());
        log::debug!("click at {:?} selects {:?}", screen, hit);
        self.state.selected = hit;
        self.selected_item()
    }

    /// Nearest item anchor within the hit radius; the first item wins a tie
    pub fn hit_test(&self, screen: DVec2) -> Option<&MapItem> {
        let projection = self.projection();
        let view = self.view();
        let mut best: Option<(&MapItem, f64)> = None;
        for item in &self.items {
            let Some(distance) = item
                .anchors(projection.wraps())
                .map(|a| view.apply(projection.project_coord(a)).distance(screen))
                .min_by(f64::total_cmp)
            else {
                continue;
            };
            if distance <= self.config.hit_radius && best.map_or(true, |(_, d)| distance < d) {
                best = Some((item, distance));
            }
        }
        best.map(|(item, _)| item)
    }

    pub fn selected_item(&self) -> Option<&MapItem> {
        let id = self.state.selected.as_deref()?;
        self.items.iter().find(|i| i.id == id)
    }

    pub fn view(&self) -> ViewTransform {
        ViewTransform::new(
            self.state.zoom,
            DVec2::new(self.state.pan_x, self.state.pan_y),
            self.canvas_size,
        )
    }

    /// World view, or the dataset fit in modes that zoom to the data
    pub fn projection(&self) -> ActiveProjection {
        let world = Equirectangular::new(self.canvas_size.x, self.canvas_size.y);
        if !self.mode.fits_dataset() {
            return ActiveProjection::World(world);
        }
        let fit = fit_dataset(
            self.items.iter().filter_map(|i| i.geometry.as_ref()),
            self.canvas_size.x,
            self.canvas_size.y,
            self.renderer.settings.fit_padding,
        );
        match fit {
            Some(fit) => ActiveProjection::Fit(fit),
            None => ActiveProjection::World(world),
        }
    }

    fn device_ratio(&self, device: DVec2) -> DVec2 {
        if self.canvas_size.x > 0.0 && self.canvas_size.y > 0.0 {
            device / self.canvas_size
        } else {
            DVec2::ONE
        }
    }

    /// Full redraw. Idempotent: the same state always paints the same picture.
    pub fn render<S: Surface + ?Sized>(&mut self, surface: &mut S) -> RenderStats {
        self.placer.reset();
        surface.clear(self.palette.background);
        surface.scale(self.device_ratio(surface.size()));
        surface.save();
        surface.transform(self.view().to_affine());

        let projection = self.projection();
        let settings = &self.renderer.settings;
        if settings.show_basemap && !self.basemap.is_empty() {
            let half_world = (projection.project(180.0, 0.0).x - projection.project(0.0, 0.0).x).abs();
            self.renderer
                .draw_basemap(surface, &self.basemap, self.palette.basemap, &projection, half_world);
        }

        let mode = self.mode;
        let range = ValueRange::of(self.items.iter().filter_map(|i| mode.value(&i.attributes)));
        let mut shapes = 0;
        for item in &self.items {
            let selected = self.state.selected.as_deref() == Some(item.id.as_str());
            let style = self.palette.shape_style(mode, &item.attributes, range, selected);
            match (&item.geometry, item.anchor) {
                (Some(geometry), _) => shapes += self.renderer.draw(surface, geometry, &style, &projection),
                (None, Some(c)) => shapes += self.renderer.draw(surface, &Geometry::Point(c), &style, &projection),
                (None, None) => {}
            }
            if let (true, Some(wrapped)) = (projection.wraps(), &item.wrapped) {
                self.renderer.draw(surface, wrapped, &style, &projection);
            }
        }

        if settings.show_labels {
            let mut order: Vec<(&MapItem, f64)> = self.items.iter().map(|i| (i, i.priority(mode))).collect();
            // Stable, so equal priorities keep dataset order
            order.sort_by(|a, b| b.1.total_cmp(&a.1));
            for (item, priority) in order {
                // First copy whose anchor lands on the canvas
                let (canvas_w, canvas_h) = (self.canvas_size.x, self.canvas_size.y);
                let on_canvas = |c: &(f64, f64)| {
                    let p = projection.project_coord(*c);
                    (0.0..=canvas_w).contains(&p.x) && (0.0..=canvas_h).contains(&p.y)
                };
                let Some((lon, lat)) = item.anchors(projection.wraps()).find(on_canvas).or(item.anchor) else {
                    log::trace!("label {:?} skipped: no anchor", item.name);
                    continue;
                };
                let sub_text = mode.sub_text(&item.attributes);
                let request = LabelRequest {
                    anchor: Anchor::Point { lat, lon },
                    text: &item.name,
                    sub_text: sub_text.as_deref(),
                    priority,
                };
                self.placer
                    .place_label(surface, &projection, request, self.canvas_size.x, self.canvas_size.y);
            }
        }

        surface.restore();
        self.draw_overlay(surface);

        self.stats = RenderStats {
            shapes,
            labels_placed: self.placer.placed().len(),
            labels_dropped: self.placer.dropped(),
        };
        self.stats
    }

    /// Info box for the selected item, in screen space
    fn draw_overlay<S: Surface + ?Sized>(&self, surface: &mut S) {
        let Some(item) = self.selected_item() else { return };
        const MARGIN: f64 = 8.0;
        const PAD: f64 = 4.0;

        let mut lines = vec![item.name.clone(), format!("{} #{}", item.kind(), item.id)];
        if let Some(value) = self.mode.value(&item.attributes) {
            lines.push(format!("{}: {}", self.mode.name(), format_compact(value)));
        } else if let Some(key) = self.mode.category_key() {
            if let Some(value) = item.attributes.get(key) {
                lines.push(format!("{}: {}", key, value));
            }
        }

        let font = self.placer.style().font_size;
        let sizes: Vec<DVec2> = lines.iter().map(|l| surface.measure_text(l, font)).collect();
        let width = sizes.iter().fold(0.0_f64, |w, s| w.max(s.x)) + 2.0 * PAD;
        let height = sizes.iter().map(|s| s.y + PAD).sum::<f64>() + PAD;

        let mut frame = Path::new();
        frame.rect(DVec2::splat(MARGIN), DVec2::new(width, height));
        surface.fill_path(&frame, self.palette.overlay, FillRule::NonZero);
        surface.stroke_path(&frame, self.palette.outline, 1.0);

        let mut y = MARGIN + PAD;
        for (line, size) in lines.iter().zip(&sizes) {
            let center = DVec2::new(MARGIN + width / 2.0, y + size.y / 2.0);
            surface.fill_text(line, center, font, self.palette.overlay_text);
            y += size.y + PAD;
        }
    }
}
