//! The compositor: mockup + elements + background -> raster image.
//!
//! Coordinate spaces: element positions are preview-pixel offsets from the
//! preview center. At export they are rescaled by the ratio of the mockup's
//! raster draw size to its on-screen preview size, then multiplied by the
//! calibration factors. Calibration never affects the preview.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use tiny_skia::{FilterQuality, Pixmap, PixmapPaint, Transform};

use casekit_core::{CalibrationProfile, Element, ImageInfo};

use crate::error::{RenderError, RenderResult};

/// Fixed JPEG quality for lossy export.
pub const JPEG_QUALITY: u8 = 90;

/// Square target sizes exposed as user choices. `render` accepts any
/// positive size.
pub const CANONICAL_SIZES: [u32; 4] = [600, 800, 1000, 1200];

/// Default export edge length in pixels.
pub const DEFAULT_SIZE: u32 = 1200;

/// Export encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Lossless PNG.
    Png,
    /// Lossy JPEG at the fixed quality.
    Jpg,
}

impl ExportFormat {
    /// File extension for the format.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpg => "jpg",
        }
    }
}

/// Target resolution and encoding for one export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
    /// Output encoding.
    pub format: ExportFormat,
}

impl ExportTarget {
    /// A square target.
    #[must_use]
    pub fn square(size: u32, format: ExportFormat) -> Self {
        Self {
            width: size,
            height: size,
            format,
        }
    }
}

impl Default for ExportTarget {
    fn default() -> Self {
        Self::square(DEFAULT_SIZE, ExportFormat::Png)
    }
}

/// The mockup's on-screen size in the live preview, in CSS pixels.
///
/// Element positions are expressed relative to this box; the compositor
/// rescales them into canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewGeometry {
    /// On-screen mockup width.
    pub mockup_width: f64,
    /// On-screen mockup height.
    pub mockup_height: f64,
}

impl PreviewGeometry {
    /// Geometry equal to the mockup's natural size (headless export, where
    /// no live preview exists).
    #[must_use]
    pub fn natural(info: ImageInfo) -> Self {
        Self {
            mockup_width: f64::from(info.width),
            mockup_height: f64::from(info.height),
        }
    }
}

/// One element paired with its decoded image.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    /// The element's transform and stacking state.
    pub element: &'a Element,
    /// The decoded source image.
    pub image: &'a RgbaImage,
}

/// Renders the final composite. One instance per target configuration.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    target: ExportTarget,
}

impl Compositor {
    /// Create a compositor for the given target.
    #[must_use]
    pub fn new(target: ExportTarget) -> Self {
        Self { target }
    }

    /// Create a compositor for the default 1200x1200 PNG target.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ExportTarget::default())
    }

    /// The configured target.
    #[must_use]
    pub fn target(&self) -> ExportTarget {
        self.target
    }

    /// Composite the mockup and elements over the background color.
    ///
    /// Draw order is ascending `layer_index`, partitioned by each element's
    /// `layer_front` flag: back elements, then the mockup, then front
    /// elements — matching the preview, where the mockup occupies a fixed
    /// z-plane.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::Compose`] for a zero-sized target, an invalid
    /// background color, or an empty asset.
    pub fn render(
        &self,
        mockup: &RgbaImage,
        layers: &[Layer<'_>],
        background: &str,
        calibration: &CalibrationProfile,
        preview: PreviewGeometry,
    ) -> RenderResult<RgbaImage> {
        let (width, height) = (self.target.width, self.target.height);
        let mut canvas = Pixmap::new(width, height)
            .ok_or_else(|| RenderError::Compose(format!("invalid target {width}x{height}")))?;

        canvas.fill(parse_hex_color(background)?);

        // Aspect-fit the mockup, centered. A square mockup on a square
        // canvas degenerates to an edge-to-edge fill with no margins.
        let mockup_pixmap = rgba_to_pixmap(mockup)?;
        let nat_w = f64::from(mockup.width());
        let nat_h = f64::from(mockup.height());
        let mockup_scale = (f64::from(width) / nat_w).min(f64::from(height) / nat_h);
        let draw_w = nat_w * mockup_scale;
        let draw_h = nat_h * mockup_scale;
        let draw_x = (f64::from(width) - draw_w) / 2.0;
        let draw_y = (f64::from(height) - draw_h) / 2.0;

        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };

        let mut ordered: Vec<Layer<'_>> = layers.to_vec();
        ordered.sort_by_key(|l| l.element.transform.layer_index);

        for layer in ordered.iter().filter(|l| !l.element.transform.layer_front) {
            self.draw_element(
                &mut canvas,
                layer,
                &paint,
                calibration,
                preview,
                mockup_scale,
                (draw_w, draw_h),
            )?;
        }

        #[allow(clippy::cast_possible_truncation)]
        let mockup_transform = Transform::from_scale(mockup_scale as f32, mockup_scale as f32)
            .post_translate(draw_x as f32, draw_y as f32);
        canvas.draw_pixmap(0, 0, mockup_pixmap.as_ref(), &paint, mockup_transform, None);

        for layer in ordered.iter().filter(|l| l.element.transform.layer_front) {
            self.draw_element(
                &mut canvas,
                layer,
                &paint,
                calibration,
                preview,
                mockup_scale,
                (draw_w, draw_h),
            )?;
        }

        Ok(pixmap_to_rgba(&canvas))
    }

    /// Render and encode in one step.
    ///
    /// # Errors
    ///
    /// Propagates composition and encoding errors.
    pub fn render_encoded(
        &self,
        mockup: &RgbaImage,
        layers: &[Layer<'_>],
        background: &str,
        calibration: &CalibrationProfile,
        preview: PreviewGeometry,
    ) -> RenderResult<Vec<u8>> {
        let image = self.render(mockup, layers, background, calibration, preview)?;
        encode(&image, self.target.format)
    }

    /// Place one element: translate to its calibrated canvas position,
    /// rotate about that point, scale, and draw the image centered on its
    /// own natural size.
    #[allow(clippy::cast_possible_truncation, clippy::too_many_arguments)]
    fn draw_element(
        &self,
        canvas: &mut Pixmap,
        layer: &Layer<'_>,
        paint: &PixmapPaint,
        calibration: &CalibrationProfile,
        preview: PreviewGeometry,
        mockup_scale: f64,
        (draw_w, draw_h): (f64, f64),
    ) -> RenderResult<()> {
        let transform = &layer.element.transform;
        let pixmap = rgba_to_pixmap(layer.image)?;

        let scale_x = draw_w / preview.mockup_width;
        let scale_y = draw_h / preview.mockup_height;

        let center_x = f64::from(self.target.width) / 2.0
            + transform.position_x * scale_x * calibration.x_position_factor;
        let center_y = f64::from(self.target.height) / 2.0
            + transform.position_y * scale_y * calibration.y_position_factor;
        let scale = (transform.zoom / 100.0) * mockup_scale * calibration.zoom_factor;

        let placement = Transform::from_translate(
            -(f64::from(layer.image.width()) / 2.0) as f32,
            -(f64::from(layer.image.height()) / 2.0) as f32,
        )
        .post_scale(scale as f32, scale as f32)
        .post_concat(Transform::from_rotate(transform.rotation as f32))
        .post_translate(center_x as f32, center_y as f32);

        canvas.draw_pixmap(0, 0, pixmap.as_ref(), paint, placement, None);
        Ok(())
    }
}

/// Encode a composite as PNG or JPEG bytes. Both transports carry identical
/// visual output; only the encoding differs.
///
/// # Errors
///
/// Returns [`RenderError::Encode`] if the encoder fails.
pub fn encode(image: &RgbaImage, format: ExportFormat) -> RenderResult<Vec<u8>> {
    let mut buf = std::io::Cursor::new(Vec::new());
    match format {
        ExportFormat::Png => {
            image
                .write_to(&mut buf, image::ImageFormat::Png)
                .map_err(|e| RenderError::Encode(format!("PNG encoding failed: {e}")))?;
        }
        ExportFormat::Jpg => {
            // The canvas is opaque after the background fill; drop alpha.
            let rgb = image::DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            rgb.write_with_encoder(encoder)
                .map_err(|e| RenderError::Encode(format!("JPEG encoding failed: {e}")))?;
        }
    }
    Ok(buf.into_inner())
}

/// Deterministic export file name: sanitized model + dimensions + extension.
#[must_use]
pub fn export_file_name(model: &str, target: ExportTarget) -> String {
    format!(
        "{}_{}x{}.{}",
        sanitize_name(model),
        target.width,
        target.height,
        target.format.extension()
    )
}

/// Collapse whitespace runs to single underscores.
pub(crate) fn sanitize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Parse `#RRGGBB` into an opaque color.
fn parse_hex_color(hex: &str) -> RenderResult<tiny_skia::Color> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(RenderError::Compose(format!(
            "invalid background color {hex:?}"
        )));
    }
    let channel = |i: usize| -> u8 {
        u8::from_str_radix(&digits[i..i + 2], 16).unwrap_or(0)
    };
    Ok(tiny_skia::Color::from_rgba8(
        channel(0),
        channel(2),
        channel(4),
        255,
    ))
}

/// Premultiply an RGBA image into a tiny-skia pixmap.
fn rgba_to_pixmap(image: &RgbaImage) -> RenderResult<Pixmap> {
    let mut pixmap = Pixmap::new(image.width(), image.height()).ok_or_else(|| {
        RenderError::Compose(format!(
            "empty image {}x{}",
            image.width(),
            image.height()
        ))
    })?;
    for (src, dst) in image.pixels().zip(pixmap.pixels_mut()) {
        let [r, g, b, a] = src.0;
        *dst = tiny_skia::ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

/// Demultiply a pixmap back into an RGBA image.
fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut data = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let c = pixel.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data)
        .unwrap_or_else(|| RgbaImage::new(pixmap.width(), pixmap.height()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use casekit_core::{ElementId, ElementSource, TransformDelta};

    fn solid(w: u32, h: u32, rgba: [u8; 4]) -> RgbaImage {
        RgbaImage::from_pixel(w, h, image::Rgba(rgba))
    }

    fn element(id: u64, layer_index: usize, layer_front: bool) -> Element {
        let mut e = Element::new(
            ElementId(id),
            ElementSource::from(format!("/uploads/{id}.png")),
            format!("Element {id}"),
            layer_index,
        );
        e.transform.layer_front = layer_front;
        e
    }

    fn neutral_calibration() -> CalibrationProfile {
        CalibrationProfile {
            x_position_factor: 1.0,
            y_position_factor: 1.0,
            zoom_factor: 1.0,
        }
    }

    #[test]
    fn test_background_fills_canvas() {
        let compositor = Compositor::new(ExportTarget::square(64, ExportFormat::Png));
        let mockup = solid(16, 16, [0, 0, 0, 0]); // fully transparent
        let out = compositor
            .render(
                &mockup,
                &[],
                "#FF0000",
                &neutral_calibration(),
                PreviewGeometry {
                    mockup_width: 16.0,
                    mockup_height: 16.0,
                },
            )
            .expect("render");

        assert_eq!(out.dimensions(), (64, 64));
        assert_eq!(out.get_pixel(0, 0), &image::Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(63, 63), &image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_square_mockup_fills_edge_to_edge() {
        let compositor = Compositor::new(ExportTarget::square(100, ExportFormat::Png));
        let mockup = solid(10, 10, [0, 255, 0, 255]);
        let out = compositor
            .render(
                &mockup,
                &[],
                "#000000",
                &neutral_calibration(),
                PreviewGeometry {
                    mockup_width: 10.0,
                    mockup_height: 10.0,
                },
            )
            .expect("render");

        // No centering margins for a square mockup.
        assert_eq!(out.get_pixel(5, 5), &image::Rgba([0, 255, 0, 255]));
        assert_eq!(out.get_pixel(94, 94), &image::Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_tall_mockup_is_centered_with_margins() {
        let compositor = Compositor::new(ExportTarget::square(100, ExportFormat::Png));
        let mockup = solid(10, 20, [0, 0, 255, 255]);
        let out = compositor
            .render(
                &mockup,
                &[],
                "#FFFFFF",
                &neutral_calibration(),
                PreviewGeometry {
                    mockup_width: 10.0,
                    mockup_height: 20.0,
                },
            )
            .expect("render");

        // Height fills; width is 50px centered at 25..75.
        assert_eq!(out.get_pixel(50, 50), &image::Rgba([0, 0, 255, 255]));
        assert_eq!(out.get_pixel(10, 50), &image::Rgba([255, 255, 255, 255]));
        assert_eq!(out.get_pixel(90, 50), &image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_centered_element_lands_on_canvas_center() {
        // Single element at (0,0), rotation 0, zoom 100, square mockup,
        // 1200x1200 target: the user image center coincides with the canvas
        // center.
        let compositor = Compositor::new(ExportTarget::square(1200, ExportFormat::Png));
        let mockup = solid(600, 600, [0, 0, 0, 0]);
        let el = element(1, 0, true);
        let img = solid(10, 10, [255, 0, 0, 255]);
        let layers = [Layer {
            element: &el,
            image: &img,
        }];

        let out = compositor
            .render(
                &mockup,
                &layers,
                "#FFFFFF",
                &CalibrationProfile::default(),
                PreviewGeometry {
                    mockup_width: 600.0,
                    mockup_height: 600.0,
                },
            )
            .expect("render");

        assert_eq!(out.get_pixel(600, 600), &image::Rgba([255, 0, 0, 255]));
        assert_eq!(out.get_pixel(2, 2), &image::Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_position_scales_with_calibration() {
        let compositor = Compositor::new(ExportTarget::square(200, ExportFormat::Png));
        let mockup = solid(100, 100, [0, 0, 0, 0]);
        let mut el = element(1, 0, true);
        el.transform.apply(TransformDelta::PositionX(50.0));
        let img = solid(4, 4, [255, 0, 0, 255]);
        let layers = [Layer {
            element: &el,
            image: &img,
        }];

        // scale_x = 2, x factor 1.5 -> center lands at 100 + 50*2*1.5 = 250,
        // off-canvas right; nothing red remains at the canvas center.
        let calibration = CalibrationProfile {
            x_position_factor: 1.5,
            y_position_factor: 1.0,
            zoom_factor: 1.0,
        };
        let out = compositor
            .render(
                &mockup,
                &layers,
                "#FFFFFF",
                &calibration,
                PreviewGeometry {
                    mockup_width: 100.0,
                    mockup_height: 100.0,
                },
            )
            .expect("render");

        assert_eq!(out.get_pixel(100, 100), &image::Rgba([255, 255, 255, 255]));

        // With factor 1.0 the center lands at 200 - clipped edge, still no
        // pixel at canvas center.
        let out = compositor
            .render(
                &mockup,
                &layers,
                "#FFFFFF",
                &neutral_calibration(),
                PreviewGeometry {
                    mockup_width: 100.0,
                    mockup_height: 100.0,
                },
            )
            .expect("render");
        assert_eq!(out.get_pixel(100, 100), &image::Rgba([255, 255, 255, 255]));
        // The left half of the element is visible at x just under 200.
        assert_eq!(out.get_pixel(198, 100), &image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_draw_order_by_layer_index() {
        let compositor = Compositor::new(ExportTarget::square(100, ExportFormat::Png));
        let mockup = solid(100, 100, [0, 0, 0, 0]);

        let red = solid(20, 20, [255, 0, 0, 255]);
        let blue = solid(20, 20, [0, 0, 255, 255]);
        let mut a = element(1, 0, true);
        let mut b = element(2, 1, true);

        let layers = [
            Layer {
                element: &a,
                image: &red,
            },
            Layer {
                element: &b,
                image: &blue,
            },
        ];
        let geometry = PreviewGeometry {
            mockup_width: 100.0,
            mockup_height: 100.0,
        };

        let out = compositor
            .render(&mockup, &layers, "#FFFFFF", &neutral_calibration(), geometry)
            .expect("render");
        // B (layer 1) renders on top.
        assert_eq!(out.get_pixel(50, 50), &image::Rgba([0, 0, 255, 255]));

        // Swap stacking: A on top now, regardless of slice order.
        a.transform.layer_index = 1;
        b.transform.layer_index = 0;
        let layers = [
            Layer {
                element: &a,
                image: &red,
            },
            Layer {
                element: &b,
                image: &blue,
            },
        ];
        let out = compositor
            .render(&mockup, &layers, "#FFFFFF", &neutral_calibration(), geometry)
            .expect("render");
        assert_eq!(out.get_pixel(50, 50), &image::Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn test_mockup_covers_back_elements() {
        let compositor = Compositor::new(ExportTarget::square(100, ExportFormat::Png));
        let mockup = solid(100, 100, [0, 255, 0, 255]); // opaque
        let red = solid(20, 20, [255, 0, 0, 255]);

        let behind = element(1, 0, false);
        let layers = [Layer {
            element: &behind,
            image: &red,
        }];

        let out = compositor
            .render(
                &mockup,
                &layers,
                "#FFFFFF",
                &neutral_calibration(),
                PreviewGeometry {
                    mockup_width: 100.0,
                    mockup_height: 100.0,
                },
            )
            .expect("render");
        assert_eq!(out.get_pixel(50, 50), &image::Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_render_is_deterministic() {
        let compositor = Compositor::new(ExportTarget::square(120, ExportFormat::Png));
        let mockup = solid(60, 90, [10, 20, 30, 255]);
        let mut el = element(1, 0, true);
        el.transform.apply(TransformDelta::Rotation(37.0));
        el.transform.apply(TransformDelta::Zoom(140.0));
        el.transform.apply(TransformDelta::PositionX(12.0));
        el.transform.apply(TransformDelta::PositionY(-9.0));
        let img = solid(15, 7, [200, 100, 50, 255]);
        let layers = [Layer {
            element: &el,
            image: &img,
        }];
        let geometry = PreviewGeometry {
            mockup_width: 60.0,
            mockup_height: 90.0,
        };

        let first = compositor
            .render(
                &mockup,
                &layers,
                "#123456",
                &CalibrationProfile::default(),
                geometry,
            )
            .expect("render");
        let second = compositor
            .render(
                &mockup,
                &layers,
                "#123456",
                &CalibrationProfile::default(),
                geometry,
            )
            .expect("render");

        assert_eq!(first.as_raw(), second.as_raw());
    }

    #[test]
    fn test_encode_magic_bytes() {
        let img = solid(8, 8, [1, 2, 3, 255]);
        let png = encode(&img, ExportFormat::Png).expect("png");
        assert_eq!(&png[0..4], &[137, 80, 78, 71]);

        let jpg = encode(&img, ExportFormat::Jpg).expect("jpg");
        assert_eq!(jpg[0], 0xFF);
        assert_eq!(jpg[1], 0xD8);
    }

    #[test]
    fn test_invalid_background_rejected() {
        let compositor = Compositor::with_defaults();
        let mockup = solid(4, 4, [0, 0, 0, 255]);
        let result = compositor.render(
            &mockup,
            &[],
            "red",
            &neutral_calibration(),
            PreviewGeometry {
                mockup_width: 4.0,
                mockup_height: 4.0,
            },
        );
        assert!(matches!(result, Err(RenderError::Compose(_))));
    }

    #[test]
    fn test_export_file_name() {
        let target = ExportTarget::square(800, ExportFormat::Jpg);
        assert_eq!(
            export_file_name("iPhone 15 Pro", target),
            "iPhone_15_Pro_800x800.jpg"
        );
        assert_eq!(
            export_file_name("Inne", ExportTarget::default()),
            "Inne_1200x1200.png"
        );
    }
}
