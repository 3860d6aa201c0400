use approx::assert_abs_diff_eq;
use glam::DVec2;

use geoquery_map::braille::BrailleCanvas;
use geoquery_map::data::{demo_rows, parse_rows, simple_world};
use geoquery_map::geo::{self, Geometry};
use geoquery_map::map::{
    fit_transform, Anchor, ControllerConfig, GeometryRenderer, LabelPlacer, LabelRequest, LabelStyle, MapController,
    MapMode, Palette, Projection, RenderSettings, ShapeStyle,
};
use geoquery_map::svg::SvgSurface;
use ratatui::style::Color;

/// POLYGON((0 0, 4 0, 4 4, 0 4, 0 0)) as PostGIS prints it
const SQUARE_HEX: &str = "\\x010300000001000000050000000000000000000000000000000000000000000000000010400000000000000000000000000000104000000000000010400000000000000000000000000000104000000000000000000000000000000000";

#[test]
fn test_square_blob_to_label() {
    let geometry = geo::decode(SQUARE_HEX.as_bytes()).unwrap();
    assert!(matches!(geometry, Geometry::Polygon(_)));

    let center = geo::visual_center(&geometry).unwrap();
    assert_abs_diff_eq!(center.0, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(center.1, 2.0, epsilon = 1e-9);

    let fit = fit_transform(&geometry, 100.0, 100.0, 10.0).unwrap();
    let anchor = fit.project(2.0, 2.0);
    assert_abs_diff_eq!(anchor.x, 50.0, epsilon = 1e-9);
    assert_abs_diff_eq!(anchor.y, 50.0, epsilon = 1e-9);
    for corner in [(0.0, 0.0), (4.0, 4.0)] {
        let p = fit.project_coord(corner);
        assert!((10.0 - 1e-9..=90.0 + 1e-9).contains(&p.x));
        assert!((10.0 - 1e-9..=90.0 + 1e-9).contains(&p.y));
    }

    let mut svg = SvgSurface::new(100.0, 100.0);
    let style = ShapeStyle {
        fill: Color::Rgb(70, 130, 180),
        stroke: Color::White,
        stroke_width: 1.0,
    };
    assert_eq!(GeometryRenderer::default().draw(&mut svg, &geometry, &style, &fit), 1);

    let mut placer = LabelPlacer::new(LabelStyle::default());
    let placed = placer
        .try_place_label(
            &mut svg,
            &fit,
            LabelRequest {
                anchor: Anchor::Geometry(&geometry),
                text: "Test",
                sub_text: None,
                priority: 1.0,
            },
            100.0,
            100.0,
        )
        .unwrap();
    assert!(placed.x >= 10.0 && placed.x + placed.width <= 90.0);
    assert!(placed.y >= 10.0 && placed.y + placed.height <= 90.0);
    let label_center = placed.center();
    assert_abs_diff_eq!(label_center.x, 50.0, epsilon = 1e-9);
    assert_abs_diff_eq!(label_center.y, 50.0, epsilon = 1e-9);

    let doc = svg.to_svg();
    assert!(doc.contains(">Test</text>"));
    assert!(doc.contains("fill-rule=\"evenodd\""));
}

#[test]
fn test_rows_json_to_braille() {
    let mut json = format!(
        r#"[
            {{"id": 1, "name": "Square", "geometry": "{}", "attributes": {{"area_km2": 12.5}}}},
            {{"id": "2", "name": "Quito", "lat": -0.18, "lon": -78.47, "attributes": {{"population": 2800000}}}}
        ]"#,
        SQUARE_HEX.replace('\\', "\\\\")
    )
    .into_bytes();
    let rows = parse_rows(&mut json).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows[0].decode_geometry().unwrap().is_some());

    let mut controller = MapController::new(
        ControllerConfig::default(),
        RenderSettings::default(),
        Palette::default(),
        LabelStyle::default(),
        DVec2::new(160.0, 96.0),
    );
    controller.set_rows(&rows);
    controller.set_basemap(simple_world());

    let mut canvas = BrailleCanvas::new(80, 24);
    let stats = controller.render(&mut canvas);
    assert_eq!(stats.shapes, 2);
    assert!(canvas.rows().any(|row| row.chars().any(|c| c != '\u{2800}')));

    // Area mode zooms onto the data
    controller.set_mode(MapMode::Area);
    let stats = controller.render(&mut canvas);
    assert_eq!(stats.shapes, 2);
}

#[test]
fn test_demo_renders_on_both_surfaces() {
    let mut controller = MapController::new(
        ControllerConfig::default(),
        RenderSettings::default(),
        Palette::default(),
        LabelStyle::default(),
        DVec2::new(160.0, 96.0),
    );
    controller.set_rows(&demo_rows());

    for mode in MapMode::ALL {
        controller.set_mode(mode);
        let mut canvas = BrailleCanvas::new(80, 24);
        let braille = controller.render(&mut canvas);
        let mut svg = SvgSurface::new(640.0, 384.0);
        let vector = controller.render(&mut svg);
        // Same logical canvas, same decisions
        assert_eq!(braille.shapes, vector.shapes, "mode {}", mode.name());
        assert!(vector.labels_placed > 0, "mode {}", mode.name());
    }
}
