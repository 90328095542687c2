//! Points, dimensions and the image-space / display-space transform.
//!
//! Annotations are stored in image space (the original pixel grid of the
//! loaded image). The canvas works in display space, which changes whenever
//! the window is resized. Both transforms are pure per-axis scalings.

use serde::{Deserialize, Serialize};

/// A 2D point. Serialized as `[x, y]`.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

/// Width and height of an image or a canvas, in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Dims {
    pub width: f64,
    pub height: f64,
}

impl Dims {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn from_pixels(width: u32, height: u32) -> Self {
        Self::new(width as f64, height as f64)
    }

    /// True when both axes are finite and strictly positive.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Whole-pixel size covering these dimensions.
    pub fn pixel_size(&self) -> (u32, u32) {
        (
            self.width.max(0.0).ceil() as u32,
            self.height.max(0.0).ceil() as u32,
        )
    }
}

/// Map an image-space point onto a canvas of size `display`.
///
/// `image` must have nonzero dimensions; callers only hold a canvas once an
/// image has been loaded.
pub fn to_display(p: Point, image: Dims, display: Dims) -> Point {
    Point::new(
        p.x * display.width / image.width,
        p.y * display.height / image.height,
    )
}

/// Map a display-space point back into image space. Inverse of [`to_display`].
pub fn to_image(p: Point, image: Dims, display: Dims) -> Point {
    Point::new(
        p.x * image.width / display.width,
        p.y * image.height / display.height,
    )
}

/// Largest aspect-preserving size of `natural` that fits in `viewport`.
///
/// Never upscales. Width is clamped first, then height; when the height
/// clamp kicks in the width is recomputed from the aspect ratio, which can
/// leave the width under its cap.
pub fn fit_to_viewport(natural: Dims, viewport: Dims) -> Dims {
    let mut width = natural.width;
    let mut height = natural.height;
    let max_width = width.min(viewport.width.max(1.0));
    let max_height = height.min(viewport.height.max(1.0));

    if width > max_width || height > max_height {
        let aspect = width / height;
        if width > max_width {
            width = max_width;
            height = width / aspect;
        }
        if height > max_height {
            height = max_height;
            width = height * aspect;
        }
    }

    Dims::new(width, height)
}

/// A horizontal run of covered pixels `[x_start, x_end)` on row `y`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Span {
    pub y: u32,
    pub x_start: u32,
    pub x_end: u32,
}

/// Pixels covered by the closed polygon `points` on a `width` x `height` grid.
///
/// The path is closed from the last point back to the first. A pixel is
/// covered when its center lies inside the polygon under the nonzero winding
/// rule, so there is no antialiasing and the result is fully deterministic.
pub fn fill_spans(points: &[Point], width: u32, height: u32) -> Vec<Span> {
    let mut spans = Vec::new();
    if points.len() < 3 || width == 0 || height == 0 {
        return spans;
    }

    let (min_y, max_y) = points
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    if !min_y.is_finite() || !max_y.is_finite() {
        return spans;
    }
    let first_row = (min_y - 0.5).ceil().max(0.0) as u32;
    let last_row = ((max_y - 0.5).floor().min(height as f64 - 1.0)).max(-1.0);
    if last_row < first_row as f64 {
        return spans;
    }
    let last_row = last_row as u32;

    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for y in first_row..=last_row {
        let sy = y as f64 + 0.5;
        crossings.clear();

        let mut prev = points[points.len() - 1];
        for &cur in points {
            let (a, b) = (prev, cur);
            prev = cur;
            let dir = if a.y <= sy && b.y > sy {
                1
            } else if b.y <= sy && a.y > sy {
                -1
            } else {
                continue;
            };
            let t = (sy - a.y) / (b.y - a.y);
            crossings.push((a.x + t * (b.x - a.x), dir));
        }
        crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

        let mut winding = 0;
        let mut run_start = 0.0;
        for &(x, dir) in &crossings {
            let was_inside = winding != 0;
            winding += dir;
            let is_inside = winding != 0;
            if !was_inside && is_inside {
                run_start = x;
            } else if was_inside && !is_inside {
                push_span(&mut spans, y, run_start, x, width);
            }
        }
    }

    spans
}

fn push_span(spans: &mut Vec<Span>, y: u32, from: f64, to: f64, width: u32) {
    // pixel centers px + 0.5 in [from, to)
    let start = (from - 0.5).ceil().max(0.0);
    let end = (to - 0.5).ceil().min(width as f64);
    if end > start {
        spans.push(Span {
            y,
            x_start: start as u32,
            x_end: end as u32,
        });
    }
}
