use crate::geometry::{to_display, Dims, Point};
use crate::store::{Annotation, AnnotationId, DrawingStore};

/// Eraser reach in display pixels.
pub const DEFAULT_ERASER_RADIUS: f64 = 10.0;

/// Handles of annotations with at least one vertex strictly within `radius`
/// of `at`, measured in display space.
///
/// Only vertices are tested, not edges: a long straight edge is missed
/// unless one of its endpoints is near the pointer.
pub fn hits(
    store: &DrawingStore,
    at: Point,
    image: Dims,
    display: Dims,
    radius: f64,
) -> Vec<AnnotationId> {
    store
        .iter()
        .filter(|(_, annotation)| {
            annotation
                .points()
                .iter()
                .any(|&p| to_display(p, image, display).distance(at) < radius)
        })
        .map(|(id, _)| id)
        .collect()
}

/// Remove every annotation hit at `at` and return what was removed, in store order.
pub fn erase(
    store: &mut DrawingStore,
    at: Point,
    image: Dims,
    display: Dims,
    radius: f64,
) -> Vec<(AnnotationId, Annotation)> {
    hits(store, at, image, display, radius)
        .into_iter()
        .filter_map(|id| store.remove(id).map(|a| (id, a)))
        .collect()
}
