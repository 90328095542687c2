//! The canvas session: owns all drawing state for one loaded image.
//!
//! Input arrives as discrete [`InputEvent`]s; each is handled to completion
//! before the next, so the renderer always sees a consistent snapshot.
//! A session only exists once an image is loaded, which makes the
//! "no transform before dimensions are known" precondition structural.

use std::collections::VecDeque;

use image::GrayImage;

use crate::archive::{self, LoadedImage};
use crate::eraser;
use crate::error::{AnnotationError, ExportError};
use crate::geometry::{to_image, Dims, Point};
use crate::mask;
use crate::render::{Renderer, Surface};
use crate::store::{Annotation, AnnotationId, DrawingStore};
use crate::stroke::{StrokeCapture, StrokeState};

/// Input handled by [`CanvasSession::handle`]. Points are display space.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    Resize(Dims),
    SetEraser(bool),
    ConfirmLabel(String),
    CancelLabel,
}

/// What a handled event changed, for the parts of the UI that mirror the store.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    /// A stroke was released and waits for a label.
    LabelRequested,
    Committed {
        id: AnnotationId,
        annotation: Annotation,
    },
    /// The label prompt stays open.
    LabelRejected(AnnotationError),
    Erased(Vec<(AnnotationId, Annotation)>),
    StrokeDiscarded,
}

/// FIFO of pending input events.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    events: VecDeque<InputEvent>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    pub fn pop(&mut self) -> Option<InputEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

pub struct CanvasSession {
    image: LoadedImage,
    display: Dims,
    store: DrawingStore,
    stroke: StrokeCapture,
    eraser_active: bool,
    eraser_radius: f64,
    renderer: Renderer,
}

impl CanvasSession {
    /// Start a session on a freshly loaded image and paint it.
    pub fn new<S: Surface + ?Sized>(
        image: LoadedImage,
        display: Dims,
        renderer: Renderer,
        eraser_radius: f64,
        surface: &mut S,
    ) -> Self {
        let display = if display.is_drawable() {
            display
        } else {
            image.dims()
        };
        let session = Self {
            image,
            display,
            store: DrawingStore::new(),
            stroke: StrokeCapture::new(),
            eraser_active: false,
            eraser_radius,
            renderer,
        };
        session.redraw(surface);
        session
    }

    pub fn image(&self) -> &LoadedImage {
        &self.image
    }

    pub fn image_dims(&self) -> Dims {
        self.image.dims()
    }

    pub fn display(&self) -> Dims {
        self.display
    }

    pub fn store(&self) -> &DrawingStore {
        &self.store
    }

    pub fn stroke(&self) -> &StrokeState {
        self.stroke.state()
    }

    pub fn eraser_active(&self) -> bool {
        self.eraser_active
    }

    /// True while a finished stroke waits for its label.
    pub fn is_prompting(&self) -> bool {
        self.stroke.is_committing()
    }

    /// Full repaint of the current state.
    pub fn redraw<S: Surface + ?Sized>(&self, surface: &mut S) {
        self.renderer.render(
            surface,
            &self.image.pixels,
            self.display,
            &self.store,
            self.stroke.points(),
        );
    }

    /// Handle every queued event in order.
    pub fn dispatch<S: Surface + ?Sized>(
        &mut self,
        queue: &mut EventQueue,
        surface: &mut S,
    ) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        while let Some(event) = queue.pop() {
            outcomes.extend(self.handle(event, surface));
        }
        outcomes
    }

    pub fn handle<S: Surface + ?Sized>(
        &mut self,
        event: InputEvent,
        surface: &mut S,
    ) -> Option<Outcome> {
        log::trace!("Handling {:?}", event);
        match event {
            InputEvent::PointerDown(at) if self.eraser_active => self.erase_at(at, surface),
            InputEvent::PointerDown(at) => {
                if !self.stroke.begin(at) {
                    log::debug!("Ignoring pointer down while a label is pending");
                }
                None
            }
            InputEvent::PointerMove(to) => {
                if let Some((from, to)) = self.stroke.extend(to) {
                    self.renderer.render_segment(surface, from, to);
                }
                None
            }
            InputEvent::PointerUp => {
                if self.eraser_active || !self.stroke.finish() {
                    return None;
                }
                log::debug!(
                    "Stroke finished with {} points",
                    self.stroke.points().len()
                );
                Some(Outcome::LabelRequested)
            }
            InputEvent::Resize(display) => {
                if !display.is_drawable() {
                    log::debug!("Ignoring resize to {:?}", display);
                    return None;
                }
                if display != self.display {
                    self.display = display;
                    self.redraw(surface);
                }
                None
            }
            InputEvent::SetEraser(active) => {
                self.eraser_active = active;
                if active && matches!(self.stroke.state(), StrokeState::Capturing(_)) {
                    self.stroke.reset();
                    self.redraw(surface);
                    return Some(Outcome::StrokeDiscarded);
                }
                None
            }
            InputEvent::ConfirmLabel(label) => self.confirm(label, surface),
            InputEvent::CancelLabel => {
                if self.stroke.is_idle() {
                    return None;
                }
                self.stroke.reset();
                self.redraw(surface);
                Some(Outcome::StrokeDiscarded)
            }
        }
    }

    fn confirm<S: Surface + ?Sized>(&mut self, label: String, surface: &mut S) -> Option<Outcome> {
        if !self.stroke.is_committing() {
            return None;
        }
        if label.is_empty() {
            return Some(Outcome::LabelRejected(AnnotationError::EmptyLabel));
        }

        let image_dims = self.image_dims();
        let points = self
            .stroke
            .take_pending()?
            .into_iter()
            .map(|p| to_image(p, image_dims, self.display))
            .collect();
        let outcome = match Annotation::new(points, label) {
            Ok(annotation) => {
                let id = self.store.append(annotation.clone());
                log::info!(
                    "Committed '{}' with {} points",
                    annotation.label(),
                    annotation.points().len()
                );
                Outcome::Committed { id, annotation }
            }
            Err(e) => {
                log::warn!("Dropping stroke: {}", e);
                Outcome::LabelRejected(e)
            }
        };
        self.redraw(surface);
        Some(outcome)
    }

    fn erase_at<S: Surface + ?Sized>(&mut self, at: Point, surface: &mut S) -> Option<Outcome> {
        let image_dims = self.image_dims();
        let removed = eraser::erase(
            &mut self.store,
            at,
            image_dims,
            self.display,
            self.eraser_radius,
        );
        if removed.is_empty() {
            return None;
        }
        log::info!("Erased {} annotations", removed.len());
        self.redraw(surface);
        Some(Outcome::Erased(removed))
    }

    /// The label mask at the original image resolution.
    pub fn rasterize_mask(&self) -> GrayImage {
        mask::rasterize(
            &self.store,
            self.image.pixels.width(),
            self.image.pixels.height(),
        )
    }

    /// Zip bundle of the original image and its mask.
    pub fn export(&self) -> Result<Vec<u8>, ExportError> {
        archive::export_bundle(&self.image.pixels, &self.rasterize_mask())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{DisplayList, DrawCmd};
    use image::{Rgba, RgbaImage};

    fn session(list: &mut DisplayList) -> CanvasSession {
        let image = LoadedImage {
            name: "test.png".to_string(),
            pixels: RgbaImage::from_pixel(200, 100, Rgba([255, 255, 255, 255])),
        };
        CanvasSession::new(image, Dims::new(100.0, 50.0), Renderer::default(), 10.0, list)
    }

    fn draw(session: &mut CanvasSession, list: &mut DisplayList, points: &[[f64; 2]]) {
        let mut iter = points.iter();
        let Some(&first) = iter.next() else {
            return;
        };
        session.handle(InputEvent::PointerDown(first.into()), list);
        for &p in iter {
            session.handle(InputEvent::PointerMove(p.into()), list);
        }
        assert_eq!(
            session.handle(InputEvent::PointerUp, list),
            Some(Outcome::LabelRequested)
        );
    }

    #[test]
    fn test_new_session_paints_image() {
        let mut list = DisplayList::new();
        let session = session(&mut list);
        assert_eq!(session.display(), Dims::new(100.0, 50.0));
        assert_eq!(
            list.commands(),
            &[
                DrawCmd::Clear(Dims::new(100.0, 50.0)),
                DrawCmd::Image(Dims::new(100.0, 50.0))
            ]
        );
    }

    #[test]
    fn test_moves_draw_incremental_segments() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        session.handle(InputEvent::PointerDown(Point::new(1.0, 1.0)), &mut list);
        session.handle(InputEvent::PointerMove(Point::new(2.0, 2.0)), &mut list);
        session.handle(InputEvent::PointerMove(Point::new(3.0, 2.0)), &mut list);
        // no full repaint while capturing, just two appended segments
        assert_eq!(list.commands().len(), 4);
        assert!(matches!(list.commands()[3], DrawCmd::Segment { .. }));
    }

    #[test]
    fn test_commit_stores_image_space_points() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        draw(&mut session, &mut list, &[[10.0, 10.0], [50.0, 10.0], [50.0, 40.0]]);
        assert!(session.is_prompting());

        let outcome = session.handle(InputEvent::ConfirmLabel("roof".into()), &mut list);
        let Some(Outcome::Committed { annotation, .. }) = outcome else {
            panic!("expected commit, got {:?}", outcome);
        };
        assert_eq!(annotation.label(), "roof");
        assert_eq!(
            annotation.points(),
            &[
                Point::new(20.0, 20.0),
                Point::new(100.0, 20.0),
                Point::new(100.0, 80.0)
            ]
        );
        assert!(!session.is_prompting());
        assert_eq!(session.store().len(), 1);
        // full repaint: clear, image, filled polygon
        assert_eq!(list.commands().len(), 3);
    }

    #[test]
    fn test_empty_label_keeps_prompt_open() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        draw(&mut session, &mut list, &[[10.0, 10.0], [20.0, 20.0]]);
        let before = list.commands().len();

        let outcome = session.handle(InputEvent::ConfirmLabel(String::new()), &mut list);
        assert_eq!(
            outcome,
            Some(Outcome::LabelRejected(AnnotationError::EmptyLabel))
        );
        assert!(session.store().is_empty());
        assert!(session.is_prompting());
        assert_eq!(list.commands().len(), before);

        let outcome = session.handle(InputEvent::CancelLabel, &mut list);
        assert_eq!(outcome, Some(Outcome::StrokeDiscarded));
        assert!(matches!(session.stroke(), StrokeState::Idle));
        assert_eq!(list.commands().len(), 2);
    }

    #[test]
    fn test_pointer_down_ignored_while_prompting() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        draw(&mut session, &mut list, &[[10.0, 10.0], [20.0, 20.0]]);
        session.handle(InputEvent::PointerDown(Point::new(90.0, 40.0)), &mut list);
        assert_eq!(session.stroke.points().len(), 2);
    }

    #[test]
    fn test_eraser_mode_erases_instead_of_drawing() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        draw(&mut session, &mut list, &[[10.0, 10.0], [50.0, 10.0], [50.0, 40.0]]);
        session.handle(InputEvent::ConfirmLabel("a".into()), &mut list);

        session.handle(InputEvent::SetEraser(true), &mut list);
        assert_eq!(
            session.handle(InputEvent::PointerDown(Point::new(30.0, 30.0)), &mut list),
            None
        );
        let outcome = session.handle(InputEvent::PointerDown(Point::new(52.0, 38.0)), &mut list);
        let Some(Outcome::Erased(removed)) = outcome else {
            panic!("expected erase, got {:?}", outcome);
        };
        assert_eq!(removed.len(), 1);
        assert!(session.store().is_empty());
        assert!(matches!(session.stroke(), StrokeState::Idle));
        assert_eq!(session.handle(InputEvent::PointerUp, &mut list), None);
    }

    #[test]
    fn test_erase_hits_vertices_at_display_scale() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        draw(&mut session, &mut list, &[[20.0, 10.0], [30.0, 10.0], [20.0, 20.0]]);
        session.handle(InputEvent::ConfirmLabel("a".into()), &mut list);
        assert_eq!(
            session.store().iter().next().unwrap().1.points()[0],
            Point::new(40.0, 20.0)
        );

        session.handle(InputEvent::SetEraser(true), &mut list);
        // the stored image-space coordinate is not where the vertex is drawn
        assert_eq!(
            session.handle(InputEvent::PointerDown(Point::new(40.0, 20.0)), &mut list),
            None
        );
        assert_eq!(session.store().len(), 1);

        let outcome = session.handle(InputEvent::PointerDown(Point::new(21.0, 11.0)), &mut list);
        assert!(matches!(outcome, Some(Outcome::Erased(ref removed)) if removed.len() == 1));
        assert!(session.store().is_empty());
        assert_eq!(
            list.commands(),
            &[
                DrawCmd::Clear(Dims::new(100.0, 50.0)),
                DrawCmd::Image(Dims::new(100.0, 50.0))
            ]
        );
    }

    #[test]
    fn test_enabling_eraser_discards_capture() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        session.handle(InputEvent::PointerDown(Point::new(1.0, 1.0)), &mut list);
        assert_eq!(
            session.handle(InputEvent::SetEraser(true), &mut list),
            Some(Outcome::StrokeDiscarded)
        );
        assert!(session.eraser_active());
        assert!(matches!(session.stroke(), StrokeState::Idle));
    }

    #[test]
    fn test_resize_repaints_and_ignores_degenerate_sizes() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        session.handle(InputEvent::Resize(Dims::new(0.0, 10.0)), &mut list);
        assert_eq!(session.display(), Dims::new(100.0, 50.0));

        session.handle(InputEvent::Resize(Dims::new(150.0, 75.0)), &mut list);
        assert_eq!(session.display(), Dims::new(150.0, 75.0));
        assert_eq!(list.size(), Dims::new(150.0, 75.0));
    }

    #[test]
    fn test_dispatch_drains_queue_in_order() {
        let mut list = DisplayList::new();
        let mut session = session(&mut list);
        let mut queue = EventQueue::new();
        queue.push(InputEvent::PointerDown(Point::new(10.0, 10.0)));
        queue.push(InputEvent::PointerMove(Point::new(40.0, 10.0)));
        queue.push(InputEvent::PointerMove(Point::new(40.0, 40.0)));
        queue.push(InputEvent::PointerUp);
        queue.push(InputEvent::ConfirmLabel("x".into()));

        let outcomes = session.dispatch(&mut queue, &mut list);
        assert!(queue.is_empty());
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0], Outcome::LabelRequested);
        assert!(matches!(outcomes[1], Outcome::Committed { .. }));
    }

    #[test]
    fn test_degenerate_display_falls_back_to_image_size() {
        let mut list = DisplayList::new();
        let image = LoadedImage {
            name: "t.png".to_string(),
            pixels: RgbaImage::new(8, 4),
        };
        let session =
            CanvasSession::new(image, Dims::new(0.0, 0.0), Renderer::default(), 10.0, &mut list);
        assert_eq!(session.display(), Dims::new(8.0, 4.0));
    }
}
