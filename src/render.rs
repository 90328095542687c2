//! Scene rendering behind a small draw-primitive interface.
//!
//! [`Renderer`] knows what to draw; a [`Surface`] knows how. The GUI records
//! into a [`DisplayList`] that it replays every frame, tests paint into a
//! [`RasterSurface`].

use image::{imageops, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::geometry::{fill_spans, to_display, Dims, Point, Span};
use crate::store::DrawingStore;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color4 {
    pub fn from_rgb(rgb: [u8; 3], alpha: f32) -> Self {
        Self {
            r: rgb[0] as f32 / 255.0,
            g: rgb[1] as f32 / 255.0,
            b: rgb[2] as f32 / 255.0,
            a: alpha.clamp(0.0, 1.0),
        }
    }

    pub fn to_egui(&self) -> egui::Color32 {
        egui::Color32::from_rgba_unmultiplied(
            (self.r * 255.0) as u8,
            (self.g * 255.0) as u8,
            (self.b * 255.0) as u8,
            (self.a * 255.0) as u8,
        )
    }

    pub fn to_rgba8(&self) -> Rgba<u8> {
        Rgba([
            (self.r * 255.0).round() as u8,
            (self.g * 255.0).round() as u8,
            (self.b * 255.0).round() as u8,
            (self.a * 255.0).round() as u8,
        ])
    }
}

impl Default for Color4 {
    fn default() -> Self {
        Self {
            r: 0.0,
            g: 0.0,
            b: 0.0,
            a: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LineStyle {
    pub color: Color4,
    pub width: f32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            color: Color4::default(),
            width: 1.0,
        }
    }
}

/// Outline plus translucent fill for committed annotations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathStyle {
    pub outline: LineStyle,
    pub fill: Color4,
}

impl Default for PathStyle {
    fn default() -> Self {
        Self {
            outline: LineStyle::default(),
            fill: Color4::from_rgb([0, 0, 255], 0.3),
        }
    }
}

/// Draw primitives the renderer needs. All coordinates are display space.
pub trait Surface {
    /// Wipe everything and size the surface to `size`.
    fn clear(&mut self, size: Dims);
    /// Paint the base image stretched to `size`.
    fn draw_image(&mut self, image: &RgbaImage, size: Dims);
    /// Stroke and fill the polygon through `points`, closed back to the start.
    fn draw_closed_path(&mut self, points: &[Point], style: &PathStyle);
    fn draw_line_segment(&mut self, from: Point, to: Point, style: &LineStyle);
}

#[derive(Clone, Debug, Default)]
pub struct Renderer {
    pub path_style: PathStyle,
    pub stroke_style: LineStyle,
}

impl Renderer {
    pub fn new(path_style: PathStyle, stroke_style: LineStyle) -> Self {
        Self {
            path_style,
            stroke_style,
        }
    }

    /// Full repaint: base image, every annotation in store order, then the
    /// stroke still being drawn.
    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        image: &RgbaImage,
        display: Dims,
        store: &DrawingStore,
        in_progress: &[Point],
    ) {
        let image_dims = Dims::from_pixels(image.width(), image.height());
        surface.clear(display);
        surface.draw_image(image, display);

        let mut scaled = Vec::new();
        for (_, annotation) in store.iter() {
            scaled.clear();
            scaled.extend(
                annotation
                    .points()
                    .iter()
                    .map(|&p| to_display(p, image_dims, display)),
            );
            surface.draw_closed_path(&scaled, &self.path_style);
        }

        for pair in in_progress.windows(2) {
            surface.draw_line_segment(pair[0], pair[1], &self.stroke_style);
        }
        log::trace!(
            "Rendered {} annotations at {}x{}",
            store.len(),
            display.width,
            display.height
        );
    }

    /// Incremental feedback while a stroke is captured.
    pub fn render_segment<S: Surface + ?Sized>(&self, surface: &mut S, from: Point, to: Point) {
        surface.draw_line_segment(from, to, &self.stroke_style);
    }
}

// ── Retained display list ───────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCmd {
    Clear(Dims),
    Image(Dims),
    ClosedPath {
        outline: Vec<Point>,
        fill: Vec<Span>,
        style: PathStyle,
    },
    Segment {
        from: Point,
        to: Point,
        style: LineStyle,
    },
}

/// Records draw calls so an immediate-mode GUI can replay them each frame.
///
/// A full render replaces the list; a stroke segment appends to it.
#[derive(Clone, Debug, Default)]
pub struct DisplayList {
    cmds: Vec<DrawCmd>,
    size: Dims,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCmd] {
        &self.cmds
    }

    pub fn size(&self) -> Dims {
        self.size
    }
}

impl Surface for DisplayList {
    fn clear(&mut self, size: Dims) {
        self.cmds.clear();
        self.size = size;
        self.cmds.push(DrawCmd::Clear(size));
    }

    fn draw_image(&mut self, _image: &RgbaImage, size: Dims) {
        self.cmds.push(DrawCmd::Image(size));
    }

    fn draw_closed_path(&mut self, points: &[Point], style: &PathStyle) {
        let (width, height) = self.size.pixel_size();
        self.cmds.push(DrawCmd::ClosedPath {
            outline: points.to_vec(),
            fill: fill_spans(points, width, height),
            style: *style,
        });
    }

    fn draw_line_segment(&mut self, from: Point, to: Point, style: &LineStyle) {
        self.cmds.push(DrawCmd::Segment {
            from,
            to,
            style: *style,
        });
    }
}

// ── In-memory raster ────────────────────────────────────────────────────────

/// Software surface backed by an RGBA buffer.
#[derive(Clone, Debug)]
pub struct RasterSurface {
    pixels: RgbaImage,
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
        }
    }
}

impl RasterSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    fn blend(&mut self, x: u32, y: u32, color: Rgba<u8>) {
        let Some(dst) = self.pixels.get_pixel_mut_checked(x, y) else {
            return;
        };
        *dst = blend_over(*dst, color);
    }
}

impl Surface for RasterSurface {
    fn clear(&mut self, size: Dims) {
        let (width, height) = size.pixel_size();
        self.pixels = RgbaImage::new(width, height);
    }

    fn draw_image(&mut self, image: &RgbaImage, size: Dims) {
        let (width, height) = size.pixel_size();
        if width == 0 || height == 0 {
            return;
        }
        let scaled = imageops::resize(image, width, height, imageops::FilterType::Nearest);
        imageops::replace(&mut self.pixels, &scaled, 0, 0);
    }

    fn draw_closed_path(&mut self, points: &[Point], style: &PathStyle) {
        let Some(&first) = points.first() else {
            return;
        };
        let mut prev = first;
        for &p in points.iter().skip(1).chain(std::iter::once(&first)) {
            self.draw_line_segment(prev, p, &style.outline);
            prev = p;
        }

        let fill = style.fill.to_rgba8();
        for span in fill_spans(points, self.pixels.width(), self.pixels.height()) {
            for x in span.x_start..span.x_end {
                self.blend(x, span.y, fill);
            }
        }
    }

    fn draw_line_segment(&mut self, from: Point, to: Point, style: &LineStyle) {
        let color = style.color.to_rgba8();
        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let len = (dx * dx + dy * dy).sqrt();
        let steps = (len * 2.0) as i64;
        let half_t = (style.width as f64 / 2.0).max(0.5) as i64;
        let (w, h) = (self.pixels.width() as i64, self.pixels.height() as i64);

        let mut touched = Vec::new();
        for i in 0..=steps {
            let t = i as f64 / steps.max(1) as f64;
            let cx = (from.x + dx * t) as i64;
            let cy = (from.y + dy * t) as i64;
            for oy in -half_t..=half_t {
                for ox in -half_t..=half_t {
                    let px = cx + ox;
                    let py = cy + oy;
                    if px >= 0 && px < w && py >= 0 && py < h {
                        touched.push((px as u32, py as u32));
                    }
                }
            }
        }
        // translucent strokes must not darken where samples overlap
        touched.sort_unstable();
        touched.dedup();
        for (x, y) in touched {
            self.blend(x, y, color);
        }
    }
}

fn blend_over(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as u32;
    if sa == 255 {
        return src;
    }
    let inv = 255 - sa;
    let mix = |s: u8, d: u8| ((s as u32 * sa + d as u32 * inv + 127) / 255) as u8;
    Rgba([
        mix(src[0], dst[0]),
        mix(src[1], dst[1]),
        mix(src[2], dst[2]),
        ((sa * 255 + dst[3] as u32 * inv + 127) / 255) as u8,
    ])
}
