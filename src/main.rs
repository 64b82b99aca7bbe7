use anomaly_annotator::app::AnnotatorApp;
use anomaly_annotator::config::AnnotatorConfig;
use anomaly_annotator::logging;
use anomaly_annotator::output::OutputLayout;
use anyhow::{anyhow, Context, Result};
use eframe::egui;
use tracing::info;

const TITLE: &str = "Anomaly Annotator";

fn main() -> Result<()> {
    logging::init_logs();

    let config = AnnotatorConfig::default();
    let layout = OutputLayout::new(&config.output_root, config.lossless_masks);
    layout
        .create_root()
        .context("failed to create the annotations directory")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.main_window_size)
            .with_title(TITLE),
        ..Default::default()
    };

    info!("starting {}", TITLE);
    eframe::run_native(
        TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(AnnotatorApp::new(config, layout)))),
    )
    .map_err(|e| anyhow!("failed to start the window system: {e}"))
}
