use glam::{DAffine2, DVec2};

use crate::geo::{self, Coord, Geometry};

/// Smallest scale a fit transform may produce
const MIN_SCALE: f64 = 1e-6;

/// Projects geographic coordinates to canvas pixels
pub trait Projection {
    fn project(&self, lon: f64, lat: f64) -> DVec2;

    fn project_coord(&self, (lon, lat): Coord) -> DVec2 {
        self.project(lon, lat)
    }
}

/// Equirectangular (plate carrée) projection of lon/lat to canvas pixels.
/// Values outside ±180/±90 land off-canvas.
#[inline(always)]
pub fn project(lon: f64, lat: f64, width: f64, height: f64) -> DVec2 {
    DVec2::new((lon + 180.0) / 360.0 * width, (90.0 - lat) / 180.0 * height)
}

/// Inverse of [`project`]
#[inline(always)]
pub fn unproject(p: DVec2, width: f64, height: f64) -> Coord {
    (p.x / width * 360.0 - 180.0, 90.0 - p.y / height * 180.0)
}

/// Whole-world view stretched over the canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equirectangular {
    pub width: f64,
    pub height: f64,
}

impl Equirectangular {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Projection for Equirectangular {
    fn project(&self, lon: f64, lat: f64) -> DVec2 {
        project(lon, lat, self.width, self.height)
    }
}

/// Uniform scale + translation that fits a projected geometry into a padded
/// rectangle
#[derive(Debug, Clone, PartialEq)]
pub struct FitTransform {
    pub scale: f64,
    pub tx: f64,
    pub ty: f64,
    /// The geometry the transform was computed for; seam-normalized when
    /// fitting a single geometry
    pub geometry: Geometry,
    base: Equirectangular,
}

impl FitTransform {
    /// Map an already projected point into the target rectangle
    pub fn apply(&self, projected: DVec2) -> DVec2 {
        projected * self.scale + DVec2::new(self.tx, self.ty)
    }

    pub fn to_affine(&self) -> DAffine2 {
        DAffine2::from_scale_angle_translation(DVec2::splat(self.scale), 0.0, DVec2::new(self.tx, self.ty))
    }
}

impl Projection for FitTransform {
    fn project(&self, lon: f64, lat: f64) -> DVec2 {
        self.apply(self.base.project(lon, lat))
    }
}

/// Fit `geometry` into a `width` x `height` canvas leaving `padding` pixels on
/// every side. Returns `None` for a geometry without coordinates.
pub fn fit_transform(geometry: &Geometry, width: f64, height: f64, padding: f64) -> Option<FitTransform> {
    let normalized = geo::normalize(geometry);
    fit_coords(normalized, width, height, padding)
}

/// Fit a whole dataset. Parts are not seam-normalized against each other,
/// the view covers their combined lon/lat box as given.
pub fn fit_dataset<'a>(
    geometries: impl IntoIterator<Item = &'a Geometry>,
    width: f64,
    height: f64,
    padding: f64,
) -> Option<FitTransform> {
    let bounds = geo::Bounds::of_coords(geometries.into_iter().flat_map(|g| g.coords()))?;
    let corners = Geometry::LineString(vec![(bounds.min_lon, bounds.min_lat), (bounds.max_lon, bounds.max_lat)]);
    fit_coords(corners, width, height, padding)
}

fn fit_coords(geometry: Geometry, width: f64, height: f64, padding: f64) -> Option<FitTransform> {
    let base = Equirectangular::new(width, height);

    let mut min = DVec2::splat(f64::INFINITY);
    let mut max = DVec2::splat(f64::NEG_INFINITY);
    for c in geometry.coords() {
        let p = base.project_coord(c);
        min = min.min(p);
        max = max.max(p);
    }
    if !min.is_finite() || !max.is_finite() {
        return None;
    }

    let extent = max - min;
    let available = DVec2::new(width - 2.0 * padding, height - 2.0 * padding);
    // A flat axis doesn't constrain the scale
    let axis_scale = |avail: f64, size: f64| if size > f64::EPSILON { avail / size } else { f64::INFINITY };
    let mut scale = axis_scale(available.x, extent.x).min(axis_scale(available.y, extent.y));
    if !scale.is_finite() {
        scale = 1.0;
    }
    let scale = scale.max(MIN_SCALE);

    let center = (min + max) / 2.0;
    Some(FitTransform {
        scale,
        tx: width / 2.0 - scale * center.x,
        ty: height / 2.0 - scale * center.y,
        geometry,
        base,
    })
}

/// Interactive zoom/pan around the canvas center.
/// `pan` is in pre-zoom canvas units, so screen = (p + pan - c) * zoom + c.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub zoom: f64,
    pub pan: DVec2,
    pub center: DVec2,
}

impl ViewTransform {
    pub fn new(zoom: f64, pan: DVec2, canvas_size: DVec2) -> Self {
        Self {
            zoom,
            pan,
            center: canvas_size / 2.0,
        }
    }

    /// translate(center) · scale(zoom) · translate(pan − center)
    pub fn to_affine(&self) -> DAffine2 {
        DAffine2::from_translation(self.center)
            * DAffine2::from_scale(DVec2::splat(self.zoom))
            * DAffine2::from_translation(self.pan - self.center)
    }

    /// Canvas point to screen point
    pub fn apply(&self, p: DVec2) -> DVec2 {
        (p + self.pan - self.center) * self.zoom + self.center
    }

    /// Screen point back to canvas point
    pub fn invert(&self, screen: DVec2) -> DVec2 {
        (screen - self.center) / self.zoom + self.center - self.pan
    }
}
