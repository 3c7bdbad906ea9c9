//! Raster drawing surface for map figures.
//!
//! Geographic coordinates go through a [`Viewport`] (equirectangular with the
//! usual `1 / cos(mid-latitude)` aspect correction). Shapes are anti-aliased
//! `tiny-skia` paths on a [`Pixmap`], and text is rasterized with `rusttype`
//! from the embedded DejaVu Sans font and blended onto the same pixmap. Sizes
//! are given in typographic points and converted with the canvas DPI.

use std::fmt;

use image::codecs::png::PngEncoder;
use image::{ColorType, DynamicImage, ImageEncoder, Rgba, RgbaImage};
use rusttype::{point, Font, Scale};
use thiserror::Error;
use tiny_skia::{FillRule, LineJoin, Paint, Path, PathBuilder, Pixmap, Stroke, Transform};

/// Embedded font data - DejaVu Sans.
const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

/// Emoji presentation selector; DejaVu has no glyph for it.
const VARIATION_SELECTOR_16: char = '\u{fe0f}';

/// Cubic control-point distance for a quarter circle of radius 1.
const KAPPA: f32 = 0.552_284_8;

#[derive(Debug, Error)]
pub enum CanvasError {
    #[error("embedded font could not be parsed")]
    Font,
    #[error("drawing surface could not be allocated")]
    Surface,
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// An opaque RGB color, displayed as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(u32);

impl Color {
    pub const WHITE: Color = Color::hex(0xffffff);

    pub const fn hex(rgb: u32) -> Self {
        Color(rgb & 0xff_ffff)
    }

    pub fn channels(self) -> [u8; 3] {
        let [_, r, g, b] = self.0.to_be_bytes();
        [r, g, b]
    }

    pub fn rgba(self) -> Rgba<u8> {
        let [r, g, b] = self.channels();
        Rgba([r, g, b, 255])
    }

    fn paint(self) -> Paint<'static> {
        let [r, g, b] = self.channels();
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, 255);
        paint.anti_alias = true;
        paint
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:06x}", self.0)
    }
}

/// Geographic bounding box in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub fn around(lon: f64, lat: f64) -> Self {
        Self {
            min_lon: lon,
            min_lat: lat,
            max_lon: lon,
            max_lat: lat,
        }
    }

    pub fn include(&mut self, lon: f64, lat: f64) {
        if !lon.is_finite() || !lat.is_finite() {
            return;
        }
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
    }

    /// Grow each side by `fraction` of the span (autoscale margins).
    pub fn padded(self, fraction: f64) -> Self {
        let dx = (self.max_lon - self.min_lon).max(1e-6) * fraction;
        let dy = (self.max_lat - self.min_lat).max(1e-6) * fraction;
        Self {
            min_lon: self.min_lon - dx,
            min_lat: self.min_lat - dy,
            max_lon: self.max_lon + dx,
            max_lat: self.max_lat + dy,
        }
    }
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Maps lon/lat degrees onto pixels inside a plot area.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    min_lon: f64,
    max_lat: f64,
    px_per_lon: f64,
    px_per_lat: f64,
    origin_x: f64,
    origin_y: f64,
    map_width: f64,
}

impl Viewport {
    /// Fit `bounds` into `area`, centered, keeping geographic aspect.
    pub fn fit(bounds: Bounds, area: PixelRect) -> Self {
        let mid_lat = (bounds.min_lat + bounds.max_lat) / 2.0;
        let aspect = 1.0 / mid_lat.to_radians().cos().abs().max(1e-3);
        let span_lon = (bounds.max_lon - bounds.min_lon).max(1e-9);
        let span_lat = (bounds.max_lat - bounds.min_lat).max(1e-9);

        let k = (area.width as f64 / span_lon).min(area.height as f64 / (span_lat * aspect));
        let map_width = span_lon * k;
        let map_height = span_lat * aspect * k;

        Self {
            min_lon: bounds.min_lon,
            max_lat: bounds.max_lat,
            px_per_lon: k,
            px_per_lat: k * aspect,
            origin_x: area.x as f64 + (area.width as f64 - map_width) / 2.0,
            origin_y: area.y as f64 + (area.height as f64 - map_height) / 2.0,
            map_width,
        }
    }

    pub fn project(&self, lon: f64, lat: f64) -> (f32, f32) {
        (
            (self.origin_x + (lon - self.min_lon) * self.px_per_lon) as f32,
            (self.origin_y + (self.max_lat - lat) * self.px_per_lat) as f32,
        )
    }

    /// Pixel row of the top edge of the map.
    pub fn top(&self) -> f32 {
        self.origin_y as f32
    }

    /// Pixel column of the horizontal center of the map.
    pub fn center_x(&self) -> f32 {
        (self.origin_x + self.map_width / 2.0) as f32
    }
}

/// Style of a text box drawn behind a label.
#[derive(Debug, Clone, Copy)]
pub struct LabelBox {
    pub fill: Color,
    pub border: Color,
    /// Border width in points
    pub border_width: f32,
    /// Padding around the text, as a fraction of the font size
    pub pad: f32,
}

pub struct Canvas {
    pixmap: Pixmap,
    font: Font<'static>,
    dpi: f32,
}

impl Canvas {
    /// A white canvas of `width_in` x `height_in` inches at `dpi`.
    pub fn new(width_in: f32, height_in: f32, dpi: u32) -> Result<Self, CanvasError> {
        let font = Font::try_from_bytes(FONT_DATA).ok_or(CanvasError::Font)?;
        let dpi = dpi.max(1) as f32;
        let width = (width_in * dpi).round().max(1.0) as u32;
        let height = (height_in * dpi).round().max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height).ok_or(CanvasError::Surface)?;
        pixmap.fill(tiny_skia::Color::WHITE);
        Ok(Self { pixmap, font, dpi })
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    /// Convert typographic points to pixels.
    pub fn pt(&self, points: f32) -> f32 {
        points * self.dpi / 72.0
    }

    /// Fill the area enclosed by `rings` using the even-odd rule, so holes
    /// listed after the exterior stay unfilled.
    pub fn fill_polygon(&mut self, rings: &[Vec<(f32, f32)>], color: Color) {
        let mut pb = PathBuilder::new();
        for ring in rings.iter().filter(|ring| ring.len() >= 3) {
            push_ring(&mut pb, ring);
        }
        if let Some(path) = pb.finish() {
            self.pixmap.fill_path(
                &path,
                &color.paint(),
                FillRule::EvenOdd,
                Transform::identity(),
                None,
            );
        }
    }

    /// Outline a closed ring with a line `width_pt` points wide.
    pub fn stroke_ring(&mut self, ring: &[(f32, f32)], color: Color, width_pt: f32) {
        if ring.len() < 2 {
            return;
        }
        let width_px = self.pt(width_pt);
        let mut pb = PathBuilder::new();
        push_ring(&mut pb, ring);
        if let Some(path) = pb.finish() {
            self.stroke(&path, color, width_px);
        }
    }

    /// Filled circular marker, `diameter_pt` points across.
    pub fn draw_marker(&mut self, center: (f32, f32), diameter_pt: f32, color: Color) {
        let radius = self.pt(diameter_pt) / 2.0;
        if let Some(path) = PathBuilder::from_circle(center.0, center.1, radius) {
            self.pixmap.fill_path(
                &path,
                &color.paint(),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    /// Multi-line text whose top-left corner sits at `anchor`, on a rounded box.
    pub fn draw_label(
        &mut self,
        anchor: (f32, f32),
        text: &str,
        size_pt: f32,
        text_color: Color,
        style: LabelBox,
    ) {
        let font_px = self.pt(size_pt);
        let scale = Scale::uniform(font_px);
        let lines: Vec<String> = text.lines().map(drawable).collect();
        let line_height = self.line_height(scale);
        let text_width = lines
            .iter()
            .map(|line| self.measure(line, scale))
            .fold(0.0_f32, f32::max);
        let text_height = line_height * lines.len() as f32;

        let pad = style.pad * font_px;
        let (x, y) = (anchor.0 - pad, anchor.1 - pad);
        let (w, h) = (text_width + 2.0 * pad, text_height + 2.0 * pad);
        let border = self.pt(style.border_width);

        if let Some(path) = rounded_rect(x, y, w, h, pad) {
            self.pixmap.fill_path(
                &path,
                &style.fill.paint(),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
        // Inset by half the width so the border stays inside the box.
        let half = border / 2.0;
        if let Some(path) = rounded_rect(x + half, y + half, w - border, h - border, pad - half) {
            self.stroke(&path, style.border, border);
        }

        for (i, line) in lines.iter().enumerate() {
            self.draw_text((anchor.0, anchor.1 + i as f32 * line_height), scale, line, text_color);
        }
    }

    /// Single line of text horizontally centered on `center_x`, bottom edge at `bottom`.
    pub fn draw_title(&mut self, text: &str, size_pt: f32, center_x: f32, bottom: f32, color: Color) {
        let scale = Scale::uniform(self.pt(size_pt));
        let text = drawable(text);
        let width = self.measure(&text, scale);
        let top = (bottom - self.line_height(scale)).max(0.0);
        self.draw_text((center_x - width / 2.0, top), scale, &text, color);
    }

    /// Crop to the drawn content plus `pad_in` inches, then encode as PNG.
    pub fn into_png(self, pad_in: f32) -> Result<Vec<u8>, CanvasError> {
        let pad = (pad_in * self.dpi).round() as u32;
        let (width, height) = (self.pixmap.width(), self.pixmap.height());
        // Every pixel is opaque, so the premultiplied data is plain RGBA.
        let image = RgbaImage::from_raw(width, height, self.pixmap.take())
            .ok_or(CanvasError::Surface)?;

        let cropped = match content_bounds(&image) {
            Some((x0, y0, x1, y1)) => {
                let x = x0.saturating_sub(pad);
                let y = y0.saturating_sub(pad);
                let w = (x1 + pad + 1).min(width) - x;
                let h = (y1 + pad + 1).min(height) - y;
                image::imageops::crop_imm(&image, x, y, w, h).to_image()
            }
            None => image,
        };

        let rgb = DynamicImage::ImageRgba8(cropped).to_rgb8();
        let mut bytes = Vec::new();
        PngEncoder::new(&mut bytes).write_image(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ColorType::Rgb8,
        )?;
        Ok(bytes)
    }

    /// Color of the pixel containing `at`.
    #[cfg(test)]
    pub(crate) fn pixel(&self, at: (f32, f32)) -> Rgba<u8> {
        let c = self
            .pixmap
            .pixel(at.0.floor() as u32, at.1.floor() as u32)
            .unwrap();
        Rgba([c.red(), c.green(), c.blue(), c.alpha()])
    }

    fn stroke(&mut self, path: &Path, color: Color, width_px: f32) {
        let stroke = Stroke {
            width: width_px,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, &color.paint(), &stroke, Transform::identity(), None);
    }

    /// Rasterize one line of text with its top-left corner at `origin`.
    fn draw_text(&mut self, origin: (f32, f32), scale: Scale, text: &str, color: Color) {
        let ascent = self.font.v_metrics(scale).ascent;
        let (width, height) = (self.pixmap.width() as i32, self.pixmap.height() as i32);
        let ink = color.channels();
        let data = self.pixmap.data_mut();

        for glyph in self.font.layout(text, scale, point(origin.0, origin.1 + ascent)) {
            let Some(bb) = glyph.pixel_bounding_box() else {
                continue;
            };
            glyph.draw(|gx, gy, coverage| {
                let (x, y) = (bb.min.x + gx as i32, bb.min.y + gy as i32);
                if x < 0 || y < 0 || x >= width || y >= height {
                    return;
                }
                let coverage = coverage.clamp(0.0, 1.0);
                let i = (y as usize * width as usize + x as usize) * 4;
                for (dst, src) in data[i..i + 3].iter_mut().zip(ink) {
                    *dst = (src as f32 * coverage + *dst as f32 * (1.0 - coverage)).round() as u8;
                }
            });
        }
    }

    fn line_height(&self, scale: Scale) -> f32 {
        let v = self.font.v_metrics(scale);
        v.ascent - v.descent + v.line_gap
    }

    fn measure(&self, text: &str, scale: Scale) -> f32 {
        self.font
            .layout(text, scale, point(0.0, 0.0))
            .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
            .fold(0.0_f32, f32::max)
    }
}

/// Append `ring` as a closed subpath, skipping rings with non-finite points.
fn push_ring(pb: &mut PathBuilder, ring: &[(f32, f32)]) {
    if !ring.iter().all(|p| p.0.is_finite() && p.1.is_finite()) {
        return;
    }
    let Some((first, rest)) = ring.split_first() else {
        return;
    };
    pb.move_to(first.0, first.1);
    for p in rest {
        pb.line_to(p.0, p.1);
    }
    pb.close();
}

/// Rectangle path whose corners are quarter circles of `radius`.
fn rounded_rect(x: f32, y: f32, w: f32, h: f32, radius: f32) -> Option<Path> {
    if !(w > 0.0 && h > 0.0) {
        return None;
    }
    let r = radius.min(w / 2.0).min(h / 2.0).max(0.0);
    let k = r * KAPPA;
    let (right, bottom) = (x + w, y + h);

    let mut pb = PathBuilder::new();
    pb.move_to(x + r, y);
    pb.line_to(right - r, y);
    pb.cubic_to(right - r + k, y, right, y + r - k, right, y + r);
    pb.line_to(right, bottom - r);
    pb.cubic_to(right, bottom - r + k, right - r + k, bottom, right - r, bottom);
    pb.line_to(x + r, bottom);
    pb.cubic_to(x + r - k, bottom, x, bottom - r + k, x, bottom - r);
    pb.line_to(x, y + r);
    pb.cubic_to(x, y + r - k, x + r - k, y, x + r, y);
    pb.close();
    pb.finish()
}

fn drawable(text: &str) -> String {
    text.chars().filter(|&c| c != VARIATION_SELECTOR_16).collect()
}

/// Inclusive bounding box of all non-white pixels.
fn content_bounds(image: &RgbaImage) -> Option<(u32, u32, u32, u32)> {
    let white = Color::WHITE.rgba();
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if *pixel == white {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }
    bounds
}
