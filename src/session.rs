use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::image_set::ImageSet;
use crate::output::OutputLayout;
use crate::painter::{Brush, MaskPainter, Outcome, PainterEvent};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Progress {
    pub processed: usize,
    pub remaining: usize,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Processed: {} / Remaining: {}",
            self.processed, self.remaining
        )
    }
}

/// Result of one finished painting session.
#[derive(Debug)]
pub struct SegmentationReport {
    pub source: PathBuf,
    pub outcome: Outcome,
}

/// Everything the main window acts on: the loaded images, where we are in
/// them, the shared brush, and at most one painter in progress.
pub struct Session {
    images: ImageSet,
    cursor: usize,
    brush: Brush,
    layout: OutputLayout,
    highlight: [u8; 3],
    painter: Option<MaskPainter>,
}

impl Session {
    pub fn new(layout: OutputLayout, brush: Brush, highlight: [u8; 3]) -> Self {
        Self {
            images: ImageSet::default(),
            cursor: 0,
            brush,
            layout,
            highlight,
            painter: None,
        }
    }

    pub fn images(&self) -> &ImageSet {
        &self.images
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn brush(&self) -> &Brush {
        &self.brush
    }

    pub fn current(&self) -> Option<&Path> {
        self.images.get(self.cursor)
    }

    pub fn progress(&self) -> Progress {
        if self.images.is_empty() {
            return Progress::default();
        }
        Progress {
            processed: self.cursor,
            remaining: self.images.len() - self.cursor - 1,
        }
    }

    /// Replaces the image set. On error the previous set and cursor are kept.
    pub fn load_directory(&mut self, dir: &Path) -> Result<usize> {
        let images = ImageSet::load(dir)?;
        info!("loaded {} images from {}", images.len(), dir.display());
        self.images = images;
        self.cursor = 0;
        self.painter = None;
        Ok(self.images.len())
    }

    /// Moves one step, clamped at both ends. Returns whether the cursor moved.
    pub fn advance(&mut self, direction: Direction) -> bool {
        match direction {
            Direction::Next if self.cursor + 1 < self.images.len() => {
                self.cursor += 1;
                true
            }
            Direction::Previous if self.cursor > 0 && !self.images.is_empty() => {
                self.cursor -= 1;
                true
            }
            Direction::Next => {
                debug!("reached the end of the image list");
                false
            }
            Direction::Previous => {
                debug!("reached the beginning of the image list");
                false
            }
        }
    }

    /// Copies the current image to the clean directory, then advances even
    /// if the copy failed. `None` when nothing is loaded.
    pub fn mark_no_anomaly(&mut self) -> Option<Result<PathBuf>> {
        if self.painter.is_some() {
            debug!("segmentation in progress, ignoring no-anomaly");
            return None;
        }
        let source = self.current()?.to_path_buf();
        info!("marking as no anomaly: {}", source.display());

        let res = self.layout.copy_clean(&source);
        if let Err(e) = &res {
            warn!("failed to save clean image: {}", e);
        }
        self.advance(Direction::Next);
        Some(res)
    }

    /// Opens a painter on the current image. The painter then receives
    /// events through [`Session::painter_event`] until it finishes.
    pub fn segment_anomaly(&mut self) -> Option<Result<()>> {
        if self.painter.is_some() {
            debug!("segmentation already in progress");
            return None;
        }
        let source = self.current()?.to_path_buf();
        info!("segmenting anomaly: {}", source.display());

        let painter = MaskPainter::open(&source, self.layout.clone(), &self.brush, self.highlight);
        Some(painter.map(|p| {
            self.painter = Some(p);
        }))
    }

    pub fn painter(&self) -> Option<&MaskPainter> {
        self.painter.as_ref()
    }

    pub fn is_painting(&self) -> bool {
        self.painter.is_some()
    }

    /// Routes one event to the active painter. Once it terminates the
    /// painter is dropped, the cursor advances and the report is returned.
    pub fn painter_event(&mut self, event: PainterEvent) -> Option<SegmentationReport> {
        let painter = self.painter.as_mut()?;
        painter.handle(event, &mut self.brush);
        if !painter.is_finished() {
            return None;
        }

        let painter = self.painter.take()?;
        let source = painter.source_path().to_path_buf();
        debug!("painter {:?} for {}", painter.phase(), source.display());
        let outcome = painter.into_outcome().unwrap_or(Outcome::Canceled);
        self.advance(Direction::Next);
        Some(SegmentationReport { source, outcome })
    }

    /// Call-and-wait form: opens a painter and feeds it `events` until it
    /// terminates. A painter still active when the events run out is
    /// canceled.
    pub fn segment_anomaly_with<I>(&mut self, events: I) -> Option<Result<SegmentationReport>>
    where
        I: IntoIterator<Item = PainterEvent>,
    {
        if let Err(e) = self.segment_anomaly()? {
            return Some(Err(e));
        }
        for event in events {
            if let Some(report) = self.painter_event(event) {
                return Some(Ok(report));
            }
        }
        self.painter_event(PainterEvent::Cancel).map(Ok)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("images", &self.images.len())
            .field("cursor", &self.cursor)
            .field("brush", &self.brush)
            .field("painting", &self.painter.is_some())
            .finish()
    }
}
