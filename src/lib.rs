//! Freehand polygon labeling of a single image, exported as an image plus a
//! binary mask.
//!
//! Annotation geometry is stored in image space and mapped to the canvas on
//! every render, so resizing the window never changes what is exported.

pub mod app;
pub mod archive;
pub mod config;
pub mod eraser;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod render;
pub mod session;
pub mod store;
pub mod stroke;

pub use archive::LoadedImage;
pub use config::Config;
pub use error::{AnnotationError, ArchiveError, ConfigError, ExportError};
pub use geometry::{Dims, Point};
pub use session::{CanvasSession, EventQueue, InputEvent, Outcome};
pub use store::{Annotation, AnnotationId, DrawingStore};
