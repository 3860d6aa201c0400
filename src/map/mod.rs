mod controller;
mod item;
mod labels;
mod projection;
mod renderer;
mod style;

pub use controller::{ActiveProjection, ControllerConfig, MapController, RenderStats, ViewportState};
pub use item::{prepare_items, MapItem};
pub use labels::{Anchor, LabelBox, LabelPlacer, LabelRequest, LabelSkip, LabelStyle};
pub use projection::{
    fit_dataset, fit_transform, project, unproject, Equirectangular, FitTransform, Projection, ViewTransform,
};
pub use renderer::{GeometryRenderer, RenderSettings};
pub use style::{format_compact, MapMode, Palette, ShapeStyle, ValueRange};
