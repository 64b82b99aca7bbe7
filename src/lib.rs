//! Manual anomaly annotation: classify images as clean or anomalous and
//! paint binary defect masks for the anomalous ones.

pub mod app;
pub mod config;
pub mod error;
pub mod image_set;
pub mod logging;
pub mod output;
pub mod painter;
pub mod painter_view;
pub mod session;

#[cfg(test)]
mod testutil;
