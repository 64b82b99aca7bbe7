use eframe::egui;
use tracing::debug;

use crate::config::AnnotatorConfig;
use crate::painter::{MaskPainter, PainterEvent};
use crate::session::{SegmentationReport, Session};

/// The "Segment Anomaly" window. Turns pointer and keyboard input into
/// [`PainterEvent`]s and feeds them to the session's active painter.
#[derive(Default)]
pub struct PainterView {
    texture: Option<egui::TextureHandle>,
    revision: Option<u64>,
    last_pixel: Option<(i32, i32)>,
}

struct Fit {
    image_rect: egui::Rect,
    scale: f32,
}

impl Fit {
    /// `None` when the canvas has no area to map pointer positions onto.
    fn new(canvas: egui::Rect, (w, h): (u32, u32)) -> Option<Self> {
        let (w, h) = (w.max(1) as f32, h.max(1) as f32);
        let scale = (canvas.width() / w).min(canvas.height() / h);
        if !scale.is_finite() || scale <= 0.0 {
            return None;
        }
        let image_rect =
            egui::Rect::from_center_size(canvas.center(), egui::vec2(w * scale, h * scale));
        Some(Self { image_rect, scale })
    }

    fn screen_to_image(&self, pos: egui::Pos2) -> (i32, i32) {
        let rel = (pos - self.image_rect.min) / self.scale;
        (rel.x.floor() as i32, rel.y.floor() as i32)
    }
}

impl PainterView {
    /// Draws the window while a painter is active. Returns the report once
    /// the painter terminates.
    pub fn show(
        &mut self,
        ctx: &egui::Context,
        session: &mut Session,
        config: &AnnotatorConfig,
    ) -> Option<SegmentationReport> {
        session.painter()?;

        let builder = egui::ViewportBuilder::default()
            .with_title("Segment Anomaly")
            .with_inner_size(config.painter_window_size);

        let events = ctx.show_viewport_immediate(
            egui::ViewportId::from_hash_of("segment_anomaly"),
            builder,
            |ctx, class| {
                let mut events = Vec::new();
                let Some(painter) = session.painter() else {
                    return events;
                };
                let radius = session.brush().radius();
                let max = session.brush().max();

                match class {
                    egui::ViewportClass::Embedded => {
                        egui::Window::new("Segment Anomaly").show(ctx, |ui| {
                            self.contents(ui, painter, radius, max, config, &mut events);
                        });
                    }
                    _ => {
                        egui::CentralPanel::default().show(ctx, |ui| {
                            self.contents(ui, painter, radius, max, config, &mut events);
                        });
                    }
                }

                ctx.input(|i| {
                    if i.viewport().close_requested() || i.key_pressed(config.keys.cancel) {
                        events.push(PainterEvent::Cancel);
                    }
                    if i.key_pressed(config.keys.confirm) {
                        events.push(PainterEvent::Confirm);
                    }
                    if i.key_pressed(config.keys.reset) {
                        events.push(PainterEvent::Reset);
                    }
                });

                events
            },
        );

        for event in events {
            if let Some(report) = session.painter_event(event) {
                debug!("painter finished: {:?}", report.outcome);
                *self = Self::default();
                return Some(report);
            }
        }
        None
    }

    fn ensure_texture(&mut self, ctx: &egui::Context, painter: &MaskPainter) {
        if self.revision == Some(painter.revision()) && self.texture.is_some() {
            return;
        }
        let overlay = painter.overlay();
        let size = [overlay.width() as usize, overlay.height() as usize];
        let image = egui::ColorImage::from_rgb(size, overlay.as_raw());
        match &mut self.texture {
            Some(tex) => tex.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture =
                    Some(ctx.load_texture("overlay", image, egui::TextureOptions::NEAREST));
            }
        }
        self.revision = Some(painter.revision());
    }

    fn contents(
        &mut self,
        ui: &mut egui::Ui,
        painter: &MaskPainter,
        radius: u32,
        max: u32,
        config: &AnnotatorConfig,
        events: &mut Vec<PainterEvent>,
    ) {
        ui.horizontal(|ui| {
            let mut size = radius;
            ui.label("Brush Size:");
            if ui.add(egui::Slider::new(&mut size, 0..=max)).changed() {
                events.push(PainterEvent::BrushSize(size));
            }
            ui.separator();
            if ui.button("Confirm").clicked() {
                events.push(PainterEvent::Confirm);
            }
            if ui.button("Cancel").clicked() {
                events.push(PainterEvent::Cancel);
            }
            if ui.button("Reset").clicked() {
                events.push(PainterEvent::Reset);
            }
        });
        ui.label(config.keys.hint());
        if let Ok(mask) = painter.mask_path() {
            let name = mask.file_name().unwrap_or_default().to_string_lossy();
            ui.label(format!("Mask will be saved as {name}"));
        }
        ui.separator();

        self.ensure_texture(ui.ctx(), painter);
        let Some(tex) = &self.texture else {
            return;
        };

        let (response, canvas) =
            ui.allocate_painter(ui.available_size(), egui::Sense::click_and_drag());
        canvas.rect_filled(response.rect, 0.0, egui::Color32::from_gray(40));

        let (pressed, released, down, pos) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.primary_down(),
                i.pointer.interact_pos(),
            )
        });
        if released {
            events.push(PainterEvent::PointerUp);
            self.last_pixel = None;
        }

        let Some(fit) = Fit::new(response.rect, painter.dimensions()) else {
            return;
        };
        canvas.image(
            tex.id(),
            fit.image_rect,
            egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
            egui::Color32::WHITE,
        );

        if let Some(pos) = response.hover_pos() {
            canvas.circle_stroke(
                pos,
                radius as f32 * fit.scale,
                egui::Stroke::new(1.0, egui::Color32::WHITE),
            );
        }

        if let Some(pos) = pos {
            let (x, y) = fit.screen_to_image(pos);
            if pressed && response.hovered() && fit.image_rect.contains(pos) {
                events.push(PainterEvent::PointerDown { x, y });
                self.last_pixel = Some((x, y));
            } else if down && painter.is_dragging() && self.last_pixel != Some((x, y)) {
                events.push(PainterEvent::PointerMove { x, y });
                self.last_pixel = Some((x, y));
            }
        }
    }
}
