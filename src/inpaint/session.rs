use anyhow::{anyhow, Result};
use image::RgbaImage;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::inpaint::codec;
use crate::inpaint::composite::Compositor;
use crate::inpaint::error::{ImageRole, SubmitError};
use crate::inpaint::geometry::{CoordinateMapper, DisplayBounds, DisplayPoint, ImagePoint, Rect};
use crate::inpaint::mask::{self, Mask};
use crate::inpaint::mode::{Mode, ModeController};
use crate::inpaint::render::render_selection_overlay;
use crate::inpaint::selection::{DragOutcome, SelectionModel};
use crate::inpaint::service::{InpaintRequest, InpaintService};
use crate::settings::Settings;

/// Allows at most one submission in flight. Cloned locks share state.
#[derive(Debug, Clone, Default)]
pub struct SubmissionLock {
    in_flight: Arc<AtomicBool>,
}

impl SubmissionLock {
    pub fn try_acquire(&self) -> Option<SubmissionTicket> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SubmissionTicket {
                in_flight: Arc::clone(&self.in_flight),
            })
    }

    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Held for the lifetime of a submission; dropping it releases the lock.
#[derive(Debug)]
pub struct SubmissionTicket {
    in_flight: Arc<AtomicBool>,
}

impl Drop for SubmissionTicket {
    fn drop(&mut self) {
        self.in_flight.store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeOutcome {
    /// Auto and tiled modes: the service output is the result.
    Passthrough,
    Composited,
    /// Compositing failed; `processed` is the raw service output.
    Degraded { reason: String },
}

#[derive(Debug, Clone)]
pub struct ProcessingResult {
    pub original: RgbaImage,
    /// Encoded final image.
    pub processed: Vec<u8>,
    /// Manual mode only.
    pub mask: Option<Mask>,
    pub outcome: CompositeOutcome,
}

impl ProcessingResult {
    pub fn is_degraded(&self) -> bool {
        matches!(self.outcome, CompositeOutcome::Degraded { .. })
    }

    pub fn processed_image(&self) -> Result<RgbaImage> {
        codec::decode_rgba(&self.processed)
    }
}

/// Snapshot of the session taken when the user submits. Edits made to the
/// session afterwards do not reach it.
#[derive(Debug)]
pub struct Submission {
    _ticket: SubmissionTicket,
    original: RgbaImage,
    mask: Option<Mask>,
    request: InpaintRequest,
    compositor: Compositor,
}

impl Submission {
    pub fn request(&self) -> &InpaintRequest {
        &self.request
    }

    pub fn run(self, service: &dyn InpaintService) -> Result<ProcessingResult, SubmitError> {
        let (width, height) = self.original.dimensions();
        tracing::info!(
            mode = %self.request.mode,
            width,
            height,
            masked = self.mask.is_some(),
            "submitting to inpainting service"
        );

        let replacement = service.inpaint(&self.request).map_err(|err| {
            let message = format!("{err:#}");
            tracing::error!(error = %message, "inpainting service call failed");
            SubmitError::Service(err)
        })?;
        if image::guess_format(&replacement).is_err() {
            tracing::error!(bytes = replacement.len(), "inpainting service returned no usable image");
            return Err(SubmitError::Service(anyhow!(
                "service response is not a recognised image ({} bytes)",
                replacement.len()
            )));
        }

        let Some(mask) = self.mask else {
            tracing::info!(mode = %self.request.mode, "using service output as-is");
            return Ok(ProcessingResult {
                original: self.original,
                processed: replacement,
                mask: None,
                outcome: CompositeOutcome::Passthrough,
            });
        };

        let mask_png = self.request.mask_png.as_deref().unwrap_or_default();
        let (processed, outcome) =
            match self
                .compositor
                .composite_encoded(&self.request.image_png, mask_png, &replacement)
            {
                Ok(bytes) => (bytes, CompositeOutcome::Composited),
                Err(err) => {
                    tracing::warn!(error = %err, "compositing failed; returning uncomposited replacement");
                    (
                        replacement,
                        CompositeOutcome::Degraded {
                            reason: err.to_string(),
                        },
                    )
                }
            };
        tracing::info!(?outcome, "submission finished");

        Ok(ProcessingResult {
            original: self.original,
            processed,
            mask: Some(mask),
            outcome,
        })
    }
}

/// One image being edited: its selection, the active mode and the pointer
/// mapping for wherever the canvas is currently shown.
pub struct EditSession {
    source: RgbaImage,
    selection: SelectionModel,
    modes: ModeController,
    mapper: CoordinateMapper,
    compositor: Compositor,
    lock: SubmissionLock,
}

impl EditSession {
    pub fn new(source: RgbaImage, settings: &Settings) -> Self {
        let (width, height) = source.dimensions();
        let bounds = DisplayBounds {
            x: 0.0,
            y: 0.0,
            width: width as f64,
            height: height as f64,
        };
        Self {
            source,
            selection: SelectionModel::new(settings.min_selection_size),
            modes: ModeController::default(),
            mapper: CoordinateMapper::new(bounds, width, height),
            compositor: Compositor::new(settings.resample_filter),
            lock: SubmissionLock::default(),
        }
    }

    pub fn source(&self) -> &RgbaImage {
        &self.source
    }

    /// Replaces the image being edited; the selection no longer applies.
    pub fn set_source(&mut self, source: RgbaImage) {
        let (width, height) = source.dimensions();
        self.mapper = CoordinateMapper::new(self.mapper.display_bounds(), width, height);
        self.source = source;
        self.selection.reset();
    }

    pub fn mode(&self) -> Mode {
        self.modes.mode()
    }

    pub fn select_mode(&mut self, mode: Mode) -> bool {
        self.modes.select(mode, &mut self.selection)
    }

    pub fn selection(&self) -> &SelectionModel {
        &self.selection
    }

    pub fn set_display_bounds(&mut self, bounds: DisplayBounds) {
        self.mapper.set_display_bounds(bounds);
    }

    pub fn to_image_space(&self, point: DisplayPoint) -> Option<ImagePoint> {
        self.mapper.to_image_space(point)
    }

    pub fn is_submitting(&self) -> bool {
        self.lock.is_held()
    }

    fn accepts_drawing(&self) -> bool {
        self.modes.mode().accepts_drawing() && !self.lock.is_held()
    }

    /// Returns whether a drag started.
    pub fn pointer_down(&mut self, point: DisplayPoint) -> bool {
        if !self.accepts_drawing() {
            return false;
        }
        let Some(point) = self.mapper.to_image_space(point) else {
            return false;
        };
        self.selection.start(point);
        true
    }

    pub fn pointer_move(&mut self, point: DisplayPoint) {
        if !self.accepts_drawing() {
            return;
        }
        if let Some(point) = self.mapper.to_image_space(point) {
            self.selection.move_to(point);
        }
    }

    /// Always ends the drag. A release while drawing is not accepted drops the
    /// in-progress rect without committing it.
    pub fn pointer_up(&mut self) -> DragOutcome {
        if !self.accepts_drawing() {
            self.selection.cancel_drag();
            return DragOutcome::NoDrag;
        }
        self.selection.end()
    }

    /// Adds a rectangle given directly in image pixels, subject to the same
    /// mode and size rules as a drag.
    pub fn add_rect(&mut self, rect: Rect) -> DragOutcome {
        if !self.accepts_drawing() {
            return DragOutcome::NoDrag;
        }
        self.selection.start(ImagePoint::new(rect.x, rect.y));
        self.selection
            .move_to(ImagePoint::new(rect.x + rect.width, rect.y + rect.height));
        self.selection.end()
    }

    pub fn undo(&mut self) -> Option<Rect> {
        self.selection.undo()
    }

    pub fn clear(&mut self) {
        self.selection.clear();
    }

    pub fn overlay(&self) -> RgbaImage {
        render_selection_overlay(&self.selection, self.source.width(), self.source.height())
    }

    pub fn mask(&self) -> Mask {
        mask::rasterize(self.selection.rects(), self.source.width(), self.source.height())
    }

    /// Validates and snapshots the session for submission. Nothing is sent.
    pub fn prepare_submission(&self) -> Result<Submission, SubmitError> {
        let mode = self.modes.mode();
        if mode.requires_mask() && self.selection.is_empty() {
            return Err(SubmitError::EmptySelection);
        }
        let ticket = self.lock.try_acquire().ok_or(SubmitError::Busy)?;

        let mask = mode.requires_mask().then(|| self.mask());
        let mask_png = mask
            .as_ref()
            .map(Mask::encode_png)
            .transpose()
            .map_err(|source| SubmitError::Encode {
                role: ImageRole::Mask,
                source,
            })?;
        let image_png = codec::encode_rgba_png(&self.source).map_err(|source| SubmitError::Encode {
            role: ImageRole::Original,
            source,
        })?;

        Ok(Submission {
            _ticket: ticket,
            original: self.source.clone(),
            mask,
            request: InpaintRequest {
                mode,
                image_png,
                mask_png,
            },
            compositor: self.compositor,
        })
    }

    pub fn submit(&self, service: &dyn InpaintService) -> Result<ProcessingResult, SubmitError> {
        self.prepare_submission()?.run(service)
    }
}
