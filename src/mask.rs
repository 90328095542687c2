use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};

use crate::geometry::fill_spans;
use crate::store::DrawingStore;

pub const BACKGROUND: Luma<u8> = Luma([0]);
pub const FOREGROUND: Luma<u8> = Luma([255]);

/// Paint every annotation white on black at the original image resolution.
///
/// Annotations are filled in store order using the same implicitly closed
/// polygons the canvas shows. Coverage is decided per pixel center with no
/// antialiasing, so the output only ever holds the two mask colors.
pub fn rasterize(store: &DrawingStore, width: u32, height: u32) -> GrayImage {
    let mut mask = GrayImage::from_pixel(width, height, BACKGROUND);
    for (_, annotation) in store.iter() {
        for span in fill_spans(annotation.points(), width, height) {
            for x in span.x_start..span.x_end {
                mask.put_pixel(x, span.y, FOREGROUND);
            }
        }
    }
    log::debug!(
        "Rasterized {} annotations into {}x{} mask",
        store.len(),
        width,
        height
    );
    mask
}

pub fn encode_png(mask: &GrayImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Cursor::new(Vec::new());
    mask.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}
