//! End-to-end pipeline tests: resolve sources from disk, composite, encode.

use casekit_core::{CalibrationProfile, Element, ElementId, ElementSource, TransformDelta};
use casekit_renderer::{
    encode, AssetRoot, Compositor, ExportFormat, ExportTarget, Layer, PreviewGeometry,
    LOAD_TIMEOUT,
};
use image::RgbaImage;

fn write_png(path: &std::path::Path, w: u32, h: u32, rgba: [u8; 4]) {
    RgbaImage::from_pixel(w, h, image::Rgba(rgba))
        .save(path)
        .expect("save png");
}

fn element(id: u64, src: &str, layer_front: bool) -> Element {
    let mut e = Element::new(
        ElementId(id),
        ElementSource::from(src.to_string()),
        format!("Element {id}"),
        0,
    );
    e.transform.layer_front = layer_front;
    e
}

#[tokio::test]
async fn test_full_pipeline_from_disk_to_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mockups = dir.path().join("uploads/mockups");
    std::fs::create_dir_all(&mockups).expect("mkdir");
    write_png(&mockups.join("1_Case.png"), 50, 100, [0, 0, 0, 0]);
    write_png(&dir.path().join("uploads/art.png"), 8, 8, [255, 0, 0, 255]);

    let assets = AssetRoot::new(dir.path());
    let mut art = element(1, "/uploads/art.png", true);
    art.transform.apply(TransformDelta::Zoom(200.0));
    let elements = vec![art];

    let loaded = assets
        .load_all("/uploads/mockups/1_Case.png", &elements, LOAD_TIMEOUT)
        .await
        .expect("load");

    let compositor = Compositor::new(ExportTarget::square(200, ExportFormat::Png));
    let layers: Vec<Layer<'_>> = elements
        .iter()
        .zip(&loaded.elements)
        .map(|(element, image)| Layer { element, image })
        .collect();

    let out = compositor
        .render(
            &loaded.mockup,
            &layers,
            "#FFFFFF",
            &CalibrationProfile::default(),
            PreviewGeometry {
                mockup_width: 50.0,
                mockup_height: 100.0,
            },
        )
        .expect("render");

    // Element at the canvas center; background elsewhere.
    assert_eq!(out.get_pixel(100, 100), &image::Rgba([255, 0, 0, 255]));
    assert_eq!(out.get_pixel(3, 3), &image::Rgba([255, 255, 255, 255]));

    let png = encode(&out, ExportFormat::Png).expect("png");
    assert_eq!(&png[0..4], &[137, 80, 78, 71]);

    let jpg = encode(&out, ExportFormat::Jpg).expect("jpg");
    assert_eq!(&jpg[0..2], &[0xFF, 0xD8]);
}

#[tokio::test]
async fn test_pipeline_aborts_on_missing_mockup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let assets = AssetRoot::new(dir.path());

    let err = assets
        .load_all("/uploads/mockups/404.png", &[], LOAD_TIMEOUT)
        .await
        .expect_err("must fail");
    assert!(err.to_string().contains("404.png"));
}
