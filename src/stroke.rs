use crate::geometry::Point;

/// Where the in-progress stroke is in its lifecycle. Points are display space.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum StrokeState {
    #[default]
    Idle,
    Capturing(Vec<Point>),
    /// Pointer released; the path waits for a label.
    Committing(Vec<Point>),
}

#[derive(Clone, Debug, Default)]
pub struct StrokeCapture {
    state: StrokeState,
}

impl StrokeCapture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &StrokeState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, StrokeState::Idle)
    }

    pub fn is_committing(&self) -> bool {
        matches!(self.state, StrokeState::Committing(_))
    }

    /// Start a new stroke at `at`.
    ///
    /// A pending label prompt blocks new strokes. A stroke still being
    /// captured (pointer released outside the canvas) is restarted.
    pub fn begin(&mut self, at: Point) -> bool {
        if self.is_committing() {
            return false;
        }
        self.state = StrokeState::Capturing(vec![at]);
        true
    }

    /// Extend the stroke and return the newly added segment, if capturing.
    pub fn extend(&mut self, to: Point) -> Option<(Point, Point)> {
        let StrokeState::Capturing(points) = &mut self.state else {
            return None;
        };
        let from = *points.last()?;
        points.push(to);
        Some((from, to))
    }

    /// Release the pointer. Moves to `Committing` when a path was captured.
    pub fn finish(&mut self) -> bool {
        match std::mem::take(&mut self.state) {
            StrokeState::Capturing(points) if !points.is_empty() => {
                self.state = StrokeState::Committing(points);
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }

    pub fn points(&self) -> &[Point] {
        match &self.state {
            StrokeState::Idle => &[],
            StrokeState::Capturing(points) | StrokeState::Committing(points) => points,
        }
    }

    pub fn take_pending(&mut self) -> Option<Vec<Point>> {
        match std::mem::take(&mut self.state) {
            StrokeState::Committing(points) => Some(points),
            other => {
                self.state = other;
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.state = StrokeState::Idle;
    }
}
