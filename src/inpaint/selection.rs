use crate::inpaint::geometry::{ImagePoint, Rect};

/// Drags must be larger than this on both axes to be kept.
pub const MIN_SELECTION_SIZE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveDrag {
    anchor: ImagePoint,
    rect: Rect,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragOutcome {
    Committed(Rect),
    Discarded(Rect),
    NoDrag,
}

/// Committed rectangles in drawing order plus the drag currently in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionModel {
    committed: Vec<Rect>,
    active: Option<ActiveDrag>,
    min_size: f64,
}

impl Default for SelectionModel {
    fn default() -> Self {
        Self::new(MIN_SELECTION_SIZE)
    }
}

impl SelectionModel {
    pub fn new(min_size: f64) -> Self {
        Self {
            committed: Vec::new(),
            active: None,
            min_size,
        }
    }

    pub fn rects(&self) -> &[Rect] {
        &self.committed
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    pub fn in_progress(&self) -> Option<Rect> {
        self.active.map(|drag| drag.rect)
    }

    pub fn is_dragging(&self) -> bool {
        self.active.is_some()
    }

    pub fn start(&mut self, point: ImagePoint) {
        self.active = Some(ActiveDrag {
            anchor: point,
            rect: Rect::anchored_at(point),
        });
    }

    pub fn move_to(&mut self, point: ImagePoint) {
        if let Some(drag) = self.active.as_mut() {
            drag.rect = Rect::from_corners(drag.anchor, point);
        }
    }

    pub fn end(&mut self) -> DragOutcome {
        let Some(drag) = self.active.take() else {
            return DragOutcome::NoDrag;
        };

        if drag.rect.exceeds(self.min_size) {
            self.committed.push(drag.rect);
            tracing::debug!(rect = ?drag.rect, count = self.committed.len(), "selection committed");
            DragOutcome::Committed(drag.rect)
        } else {
            tracing::debug!(rect = ?drag.rect, "selection too small, discarded");
            DragOutcome::Discarded(drag.rect)
        }
    }

    pub fn cancel_drag(&mut self) {
        self.active = None;
    }

    pub fn undo(&mut self) -> Option<Rect> {
        self.committed.pop()
    }

    pub fn clear(&mut self) {
        self.committed.clear();
    }

    /// Drops committed rectangles and any drag in progress.
    pub fn reset(&mut self) {
        self.committed.clear();
        self.active = None;
    }
}
