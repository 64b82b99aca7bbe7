use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use eframe::egui;
use tracing::{error, info, warn};

use crate::config::AnnotatorConfig;
use crate::image_set;
use crate::output::OutputLayout;
use crate::painter::{Brush, Outcome};
use crate::painter_view::PainterView;
use crate::session::{Direction, SegmentationReport, Session};

// ── Notices ─────────────────────────────────────────────────────────────────

fn notify(level: rfd::MessageLevel, title: &str, description: &str) {
    rfd::MessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

fn report_segmentation(report: &SegmentationReport) {
    info!(
        "segmentation of {} finished, saved: {}",
        report.source.display(),
        report.outcome.is_saved()
    );
    match &report.outcome {
        Outcome::Saved(_) => notify(
            rfd::MessageLevel::Info,
            "Success",
            "Anomaly annotation saved.",
        ),
        Outcome::Canceled => notify(
            rfd::MessageLevel::Info,
            "Canceled",
            "Anomaly annotation canceled.",
        ),
        Outcome::Failed(e) => notify(
            rfd::MessageLevel::Error,
            "Error",
            &format!("Failed to save annotation: {e}"),
        ),
    }
}

fn load_texture(ctx: &egui::Context, path: &Path) -> Result<egui::TextureHandle> {
    let img = image_set::decode(path)
        .with_context(|| format!("failed to load image: {}", path.display()))?;
    let rgba = img.to_rgba8();
    let size = [rgba.width() as usize, rgba.height() as usize];
    let pixels = rgba.as_flat_samples();
    let color_image = egui::ColorImage::from_rgba_unmultiplied(size, pixels.as_slice());
    Ok(ctx.load_texture(
        path.to_string_lossy(),
        color_image,
        egui::TextureOptions::LINEAR,
    ))
}

// ── App ─────────────────────────────────────────────────────────────────────

pub struct AnnotatorApp {
    config: AnnotatorConfig,
    session: Session,
    painter_view: PainterView,

    /// Texture of the image under the cursor, keyed by its path. `None`
    /// inside means the file could not be decoded.
    preview: Option<(PathBuf, Option<egui::TextureHandle>)>,
}

impl AnnotatorApp {
    pub fn new(config: AnnotatorConfig, layout: OutputLayout) -> Self {
        let brush = Brush::new(config.brush_default, config.brush_max);
        let session = Session::new(layout, brush, config.highlight);
        Self {
            config,
            session,
            painter_view: PainterView::default(),
            preview: None,
        }
    }

    fn ensure_preview(&mut self, ctx: &egui::Context) {
        let Some(current) = self.session.current() else {
            self.preview = None;
            return;
        };
        if matches!(&self.preview, Some((path, _)) if path == current) {
            return;
        }

        let texture = match load_texture(ctx, current) {
            Ok(tex) => Some(tex),
            Err(e) => {
                error!("{:#}", e);
                None
            }
        };
        self.preview = Some((current.to_path_buf(), texture));
    }

    fn load_directory(&mut self) {
        let Some(dir) = rfd::FileDialog::new().pick_folder() else {
            return;
        };
        if let Err(e) = self.session.load_directory(&dir) {
            warn!("not loading {}: {}", dir.display(), e);
        }
    }

    fn mark_no_anomaly(&mut self) {
        match self.session.mark_no_anomaly() {
            Some(Ok(dest)) => {
                info!("copied to {}", dest.display());
                notify(
                    rfd::MessageLevel::Info,
                    "Success",
                    "Image marked as 'No Anomaly' and saved.",
                );
            }
            Some(Err(e)) => notify(
                rfd::MessageLevel::Error,
                "Error",
                &format!("Failed to save image: {e}"),
            ),
            None => {}
        }
    }

    fn segment_anomaly(&mut self) {
        if let Some(Err(e)) = self.session.segment_anomaly() {
            error!("{}", e);
        }
    }

    fn toolbar(&mut self, ui: &mut egui::Ui) {
        let idle = !self.session.is_painting();
        let has_image = idle && self.session.current().is_some();

        ui.horizontal(|ui| {
            if ui.add_enabled(idle, egui::Button::new("Load Directory")).clicked() {
                self.load_directory();
            }
            if ui.add_enabled(has_image, egui::Button::new("No Anomaly")).clicked() {
                self.mark_no_anomaly();
            }
            if ui.add_enabled(has_image, egui::Button::new("Segment Anomaly")).clicked() {
                self.segment_anomaly();
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.add_enabled(has_image, egui::Button::new("Next Image")).clicked() {
                    self.session.advance(Direction::Next);
                }
                if ui.add_enabled(has_image, egui::Button::new("Previous Image")).clicked() {
                    self.session.advance(Direction::Previous);
                }
            });
        });
    }

    fn canvas(&self, ui: &mut egui::Ui) {
        let Some((path, texture)) = &self.preview else {
            ui.centered_and_justified(|ui| {
                ui.heading("No Image Loaded");
            });
            return;
        };
        let Some(tex) = texture else {
            ui.centered_and_justified(|ui| {
                ui.label(format!("Failed to load image: {}", path.display()));
            });
            return;
        };

        let avail = ui.available_size();
        ui.centered_and_justified(|ui| {
            ui.add(egui::Image::new(tex).max_size(avail).maintain_aspect_ratio(true));
        });
    }
}

impl eframe::App for AnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if let Some(report) = self.painter_view.show(ctx, &mut self.session, &self.config) {
            report_segmentation(&report);
        }

        self.ensure_preview(ctx);

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            self.toolbar(ui);
        });

        egui::TopBottomPanel::bottom("counter").show(ctx, |ui| {
            ui.horizontal(|ui| {
                if let Some(current) = self.session.current() {
                    ui.label(format!(
                        "{} / {}",
                        self.session.images().dir().display(),
                        current.file_name().unwrap_or_default().to_string_lossy()
                    ));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(self.session.progress().to_string());
                });
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.canvas(ui);
        });
    }
}
