pub mod braille;
pub mod data;
pub mod geo;
pub mod map;
pub mod surface;
pub mod svg;
