//! Zip archive input and output.
//!
//! Input: the first `.png` entry of an uploaded archive, in lexicographic
//! entry-name order, becomes the base image. Output: a bundle holding the
//! re-encoded image and its label mask.

use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use image::{GrayImage, ImageFormat, RgbaImage};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{ArchiveError, ExportError};
use crate::geometry::Dims;
use crate::mask;

pub const IMAGE_ENTRY: &str = "image.png";
pub const LABEL_ENTRY: &str = "label.png";

/// Local file header, empty archive and spanned archive signatures.
const ZIP_SIGNATURES: [&[u8; 4]; 3] = [b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// A decoded base image and the archive entry it came from.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub name: String,
    pub pixels: RgbaImage,
}

impl LoadedImage {
    /// Original pixel dimensions; never zero on a loaded image.
    pub fn dims(&self) -> Dims {
        Dims::from_pixels(self.pixels.width(), self.pixels.height())
    }
}

/// Check if a path has a `.zip` extension.
pub fn is_zip_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false)
}

fn is_png_entry(name: &str) -> bool {
    let lower = name.to_lowercase();
    if lower.contains("__macosx") || lower.contains("/.") || lower.starts_with('.') {
        return false;
    }
    lower.ends_with(".png")
}

fn decode_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
) -> Result<LoadedImage, ArchiveError> {
    let mut file = archive.by_name(name)?;
    let mut data = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut data)?;
    log::debug!("Extracted '{}' ({} bytes)", name, data.len());

    let pixels = image::load_from_memory_with_format(&data, ImageFormat::Png)
        .map_err(|source| ArchiveError::Decode {
            name: name.to_string(),
            source,
        })?
        .to_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ArchiveError::EmptyImage {
            name: name.to_string(),
            width: pixels.width(),
            height: pixels.height(),
        });
    }

    Ok(LoadedImage {
        name: name.to_string(),
        pixels,
    })
}

/// Decode the base image out of an in-memory zip archive.
pub fn extract_image(zip_data: &[u8]) -> Result<LoadedImage, ArchiveError> {
    if !ZIP_SIGNATURES.iter().any(|sig| zip_data.starts_with(&sig[..])) {
        return Err(ArchiveError::NotZip);
    }

    let mut archive = ZipArchive::new(Cursor::new(zip_data))?;
    log::debug!("ZIP contains {} entries", archive.len());

    let mut names: Vec<String> = archive
        .file_names()
        .filter(|name| !name.ends_with('/') && is_png_entry(name))
        .map(str::to_string)
        .collect();
    names.sort();
    log::trace!("PNG candidates: {:?}", names);

    let name = names.into_iter().next().ok_or(ArchiveError::NoPng)?;
    let image = decode_entry(&mut archive, &name)?;
    log::info!(
        "Loaded '{}' ({}x{})",
        image.name,
        image.pixels.width(),
        image.pixels.height()
    );
    Ok(image)
}

/// Read a zip file from disk and decode its base image.
pub fn load_archive_file(path: &Path) -> Result<LoadedImage, ArchiveError> {
    log::info!("Opening ZIP file: {:?}", path);
    if !is_zip_path(path) {
        return Err(ArchiveError::NotZip);
    }
    let data = std::fs::read(path)?;
    extract_image(&data)
}

/// Build the output archive holding `image.png` and `label.png`.
///
/// The archive is assembled entirely in memory; on error nothing is returned.
pub fn export_bundle(image: &RgbaImage, label: &GrayImage) -> Result<Vec<u8>, ExportError> {
    let mut image_png = Cursor::new(Vec::new());
    image.write_to(&mut image_png, ImageFormat::Png)?;
    let label_png = mask::encode_png(label)?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    writer.start_file(LABEL_ENTRY, options)?;
    writer.write_all(&label_png)?;
    writer.start_file(IMAGE_ENTRY, options)?;
    writer.write_all(image_png.get_ref())?;
    let bytes = writer.finish()?.into_inner();

    log::info!("Built export bundle ({} bytes)", bytes.len());
    Ok(bytes)
}
