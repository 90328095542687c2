//! The drawing store: committed annotations, held in image space.

use serde::Serialize;

use crate::error::AnnotationError;
use crate::geometry::Point;

/// A labeled closed polygon in image-space coordinates.
///
/// The path is implicitly closed from the last point back to the first.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Annotation {
    points: Vec<Point>,
    label: String,
}

impl Annotation {
    pub fn new(points: Vec<Point>, label: impl Into<String>) -> Result<Self, AnnotationError> {
        let label = label.into();
        if label.is_empty() {
            return Err(AnnotationError::EmptyLabel);
        }
        if points.is_empty() {
            return Err(AnnotationError::EmptyPath);
        }
        Ok(Self { points, label })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Stable handle to an annotation in a [`DrawingStore`].
///
/// Handles are never reused within a store, so two geometrically identical
/// annotations always have distinct handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AnnotationId(usize);

/// Ordered collection of committed annotations.
///
/// Slots are indexed by handle. Insertion order is slot order, removal
/// leaves a hole, so both append and remove are O(1). Holes are never
/// reclaimed, since compacting would invalidate handles; `iter` is linear in
/// everything appended. A store lives for one loaded image, and loading the
/// next one starts from an empty store.
#[derive(Clone, Debug, Default)]
pub struct DrawingStore {
    slots: Vec<Option<Annotation>>,
    len: usize,
}

impl DrawingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, annotation: Annotation) -> AnnotationId {
        let id = AnnotationId(self.slots.len());
        self.slots.push(Some(annotation));
        self.len += 1;
        id
    }

    /// Remove the exact entry behind `id`. Returns `None` if it is already gone.
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.slots.get_mut(id.0)?.take();
        if removed.is_some() {
            self.len -= 1;
        }
        removed
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.slots.get(id.0)?.as_ref()
    }

    /// Live annotations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (AnnotationId, &Annotation)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|a| (AnnotationId(i), a)))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
