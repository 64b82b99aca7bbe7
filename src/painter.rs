//! Brush painting over a single image.
//!
//! [`step`] is the whole interaction protocol: it maps the current stroke
//! state and one input event to the next state plus the side effects to run.
//! [`MaskPainter`] owns the pixel buffers and carries those effects out.

use std::path::{Path, PathBuf};

use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;
use tracing::{debug, info, warn};

use crate::error::{AnnotatorError, Result};
use crate::image_set;
use crate::output::{OutputLayout, SavedAnnotation};

pub const MASK_ON: u8 = 255;

// ── Brush ───────────────────────────────────────────────────────────────────

/// Brush radius shared by every painting session of one run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Brush {
    radius: u32,
    max: u32,
}

impl Brush {
    pub fn new(radius: u32, max: u32) -> Self {
        Self {
            radius: radius.min(max),
            max,
        }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    pub fn set_radius(&mut self, radius: u32) {
        self.radius = radius.min(self.max);
    }
}

impl Default for Brush {
    fn default() -> Self {
        Self::new(5, 50)
    }
}

// ── State machine ───────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Active,
    Confirmed,
    Canceled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PainterEvent {
    PointerDown { x: i32, y: i32 },
    PointerMove { x: i32, y: i32 },
    PointerUp,
    Reset,
    Confirm,
    Cancel,
    BrushSize(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    StampAt { x: i32, y: i32, radius: u32 },
    ClearBuffers,
    PersistOutputs,
    SetBrush(u32),
}

/// Everything the protocol needs to know, minus the pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stroke {
    pub phase: Phase,
    pub dragging: bool,
    pub radius: u32,
}

impl Stroke {
    pub fn new(radius: u32) -> Self {
        Self {
            phase: Phase::Active,
            dragging: false,
            radius,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: Stroke,
    pub effects: Vec<Effect>,
}

pub fn step(stroke: &Stroke, event: PainterEvent) -> Transition {
    let mut next = *stroke;
    let mut effects = Vec::new();

    if stroke.phase != Phase::Active {
        return Transition { next, effects };
    }

    match event {
        PainterEvent::PointerDown { x, y } => {
            next.dragging = true;
            effects.push(Effect::StampAt {
                x,
                y,
                radius: stroke.radius,
            });
        }
        PainterEvent::PointerMove { x, y } => {
            if stroke.dragging {
                effects.push(Effect::StampAt {
                    x,
                    y,
                    radius: stroke.radius,
                });
            }
        }
        PainterEvent::PointerUp => next.dragging = false,
        PainterEvent::Reset => effects.push(Effect::ClearBuffers),
        PainterEvent::Confirm => {
            next.phase = Phase::Confirmed;
            next.dragging = false;
            effects.push(Effect::PersistOutputs);
        }
        PainterEvent::Cancel => {
            next.phase = Phase::Canceled;
            next.dragging = false;
        }
        PainterEvent::BrushSize(radius) => {
            next.radius = radius;
            effects.push(Effect::SetBrush(radius));
        }
    }

    Transition { next, effects }
}

// ── Painter ─────────────────────────────────────────────────────────────────

/// How a painting session ended.
#[derive(Debug)]
pub enum Outcome {
    Saved(SavedAnnotation),
    Canceled,
    Failed(AnnotatorError),
}

impl Outcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Outcome::Saved(_))
    }
}

pub struct MaskPainter {
    source_path: PathBuf,
    layout: OutputLayout,
    highlight: Rgb<u8>,

    original: RgbImage,
    overlay: RgbImage,
    mask: GrayImage,
    /// Set by any stamp since construction or the last reset.
    painted: bool,
    /// Bumped on every pixel change, for texture refreshes.
    revision: u64,

    stroke: Stroke,
    outcome: Option<Outcome>,
}

impl MaskPainter {
    pub fn open(
        source_path: &Path,
        layout: OutputLayout,
        brush: &Brush,
        highlight: [u8; 3],
    ) -> Result<Self> {
        let image = image_set::decode(source_path)?;
        Ok(Self::from_image(
            source_path,
            image.to_rgb8(),
            layout,
            brush,
            highlight,
        ))
    }

    pub fn from_image(
        source_path: &Path,
        original: RgbImage,
        layout: OutputLayout,
        brush: &Brush,
        highlight: [u8; 3],
    ) -> Self {
        let mask = GrayImage::new(original.width(), original.height());
        debug!(
            "painting {} ({}x{})",
            source_path.display(),
            original.width(),
            original.height()
        );
        Self {
            source_path: source_path.to_path_buf(),
            layout,
            highlight: Rgb(highlight),
            overlay: original.clone(),
            original,
            mask,
            painted: false,
            revision: 0,
            stroke: Stroke::new(brush.radius()),
            outcome: None,
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn phase(&self) -> Phase {
        self.stroke.phase
    }

    pub fn is_finished(&self) -> bool {
        self.stroke.phase != Phase::Active
    }

    pub fn is_dragging(&self) -> bool {
        self.stroke.dragging
    }

    pub fn overlay(&self) -> &RgbImage {
        &self.overlay
    }

    pub fn mask(&self) -> &GrayImage {
        &self.mask
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Where the mask will be written on confirm.
    pub fn mask_path(&self) -> Result<PathBuf> {
        self.layout.mask_path(&self.source_path)
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.original.dimensions()
    }

    /// Feeds one event through [`step`] and runs its effects.
    pub fn handle(&mut self, event: PainterEvent, brush: &mut Brush) {
        // Keep in sync with slider changes made outside the painter.
        self.stroke.radius = brush.radius();

        let Transition { next, effects } = step(&self.stroke, event);
        self.stroke = next;

        for effect in effects {
            match effect {
                Effect::StampAt { x, y, radius } => self.stamp(x, y, radius),
                Effect::ClearBuffers => self.clear(),
                Effect::SetBrush(radius) => {
                    brush.set_radius(radius);
                    self.stroke.radius = brush.radius();
                }
                Effect::PersistOutputs => {
                    self.outcome = Some(self.persist());
                }
            }
        }

        if self.stroke.phase == Phase::Canceled && self.outcome.is_none() {
            info!("annotation canceled for {}", self.source_path.display());
            self.outcome = Some(Outcome::Canceled);
        }
    }

    /// Consumes a finished painter; `None` while still active.
    pub fn into_outcome(self) -> Option<Outcome> {
        self.outcome
    }

    fn stamp(&mut self, x: i32, y: i32, radius: u32) {
        let (w, h) = self.mask.dimensions();
        let r = i64::from(radius);
        let (cx, cy) = (i64::from(x), i64::from(y));
        if cx + r < 0 || cy + r < 0 || cx - r >= i64::from(w) || cy - r >= i64::from(h) {
            return;
        }
        // Past the check the centre is within the image grown by `r`, so
        // imageproc's i32 arithmetic cannot overflow.
        let radius = radius as i32;
        draw_filled_circle_mut(&mut self.mask, (x, y), radius, Luma([MASK_ON]));
        draw_filled_circle_mut(&mut self.overlay, (x, y), radius, self.highlight);
        self.painted = true;
        self.revision += 1;
    }

    fn clear(&mut self) {
        self.overlay.clone_from(&self.original);
        self.mask.pixels_mut().for_each(|p| *p = Luma([0]));
        self.painted = false;
        self.revision += 1;
        debug!("strokes reset");
    }

    fn persist(&self) -> Outcome {
        let overlay = self.painted.then_some(&self.overlay);
        match self
            .layout
            .save_anomaly(&self.source_path, overlay, &self.mask)
        {
            Ok(saved) => Outcome::Saved(saved),
            Err(e) => {
                warn!("annotation not saved: {}", e);
                Outcome::Failed(e)
            }
        }
    }
}
