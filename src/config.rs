use std::path::PathBuf;

/// Keyboard shortcuts for the segmentation window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyBindings {
    pub confirm: egui::Key,
    pub cancel: egui::Key,
    pub reset: egui::Key,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            confirm: egui::Key::Enter,
            cancel: egui::Key::Escape,
            reset: egui::Key::R,
        }
    }
}

impl KeyBindings {
    pub fn hint(&self) -> String {
        format!(
            "Press '{}' to confirm, '{}' to cancel, '{}' to reset",
            self.confirm.name(),
            self.cancel.name(),
            self.reset.name()
        )
    }
}

#[derive(Clone, Debug)]
pub struct AnnotatorConfig {
    /// Root of the output tree, relative to the working directory.
    pub output_root: PathBuf,
    pub brush_default: u32,
    pub brush_max: u32,
    pub highlight: [u8; 3],
    pub keys: KeyBindings,
    /// Write masks of jpg/jpeg sources as png so they stay strictly 0/255.
    pub lossless_masks: bool,
    pub main_window_size: [f32; 2],
    pub painter_window_size: [f32; 2],
}

impl Default for AnnotatorConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("annotations"),
            brush_default: 5,
            brush_max: 50,
            highlight: [0, 255, 0],
            keys: KeyBindings::default(),
            lossless_masks: true,
            main_window_size: [800.0, 700.0],
            painter_window_size: [1000.0, 800.0],
        }
    }
}
