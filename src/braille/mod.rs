mod canvas;
pub mod raster;

pub use canvas::BrailleCanvas;
