pub mod codec;
pub mod composite;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod mode;
pub mod render;
pub mod selection;
pub mod service;
pub mod session;

pub use composite::{Compositor, ResampleFilter};
pub use error::{CompositeError, ImageRole, SubmitError};
pub use geometry::{CoordinateMapper, DisplayBounds, DisplayPoint, ImagePoint, Rect};
pub use mask::{rasterize, Mask, MaskClass};
pub use mode::{Mode, ModeController};
pub use selection::{DragOutcome, SelectionModel};
pub use service::{HttpInpaintService, InpaintRequest, InpaintService};
pub use session::{
    CompositeOutcome, EditSession, ProcessingResult, Submission, SubmissionLock, SubmissionTicket,
};
