use crate::config::PenConfig;
use crate::stroke::{InkPoint, Stroke};

/// Ordered collection of committed strokes plus the stroke being drawn.
///
/// Strokes are kept in commit order. Commit order is what world-line
/// segmentation reads, so nothing here ever re-sorts by creation time.
#[derive(Clone, Debug, Default)]
pub struct StrokeStore {
    strokes: Vec<Stroke>,
    pending: Vec<InkPoint>,
    drawing: bool,
    pen: PenConfig,
}

impl StrokeStore {
    pub fn new(pen: PenConfig) -> Self {
        Self {
            pen,
            ..Self::default()
        }
    }

    /// Start a new in-progress stroke, discarding any unfinished one.
    pub fn begin_stroke(&mut self, point: InkPoint) {
        self.pending.clear();
        self.pending.push(point);
        self.drawing = true;
    }

    /// Append a sample to the in-progress stroke. Ignored when not drawing.
    pub fn extend_stroke(&mut self, point: InkPoint) {
        if self.drawing {
            self.pending.push(point);
        }
    }

    /// Finish the in-progress stroke at `creation_time`.
    ///
    /// Returns the index of the committed stroke, or `None` when fewer than
    /// two points were accumulated (the samples are dropped silently).
    pub fn commit_stroke(&mut self, creation_time: f64) -> Option<usize> {
        self.drawing = false;
        let points = std::mem::take(&mut self.pending);
        if points.len() < 2 {
            return None;
        }
        self.strokes.push(Stroke::new(
            points,
            self.pen.width,
            self.pen.color,
            creation_time,
        ));
        Some(self.strokes.len() - 1)
    }

    /// Drop the in-progress stroke without committing it.
    pub fn discard_pending(&mut self) {
        self.pending.clear();
        self.drawing = false;
    }

    pub fn is_drawing(&self) -> bool {
        self.drawing
    }

    pub fn pending_points(&self) -> &[InkPoint] {
        &self.pending
    }

    /// Remove every stroke and any in-progress samples.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.pending.clear();
        self.drawing = false;
    }

    /// Swap in a restored stroke list wholesale.
    pub fn replace(&mut self, strokes: Vec<Stroke>) {
        self.strokes = strokes;
        self.pending.clear();
        self.drawing = false;
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub(crate) fn strokes_mut(&mut self) -> &mut [Stroke] {
        &mut self.strokes
    }

    pub fn len(&self) -> usize {
        self.strokes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strokes.is_empty()
    }

    /// Creation times in commit order.
    pub fn creation_times(&self) -> Vec<f64> {
        self.strokes.iter().map(Stroke::creation_time).collect()
    }

    pub fn pen(&self) -> &PenConfig {
        &self.pen
    }
}
