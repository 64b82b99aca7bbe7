use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};
use tracing::{debug, info};

use crate::error::{AnnotatorError, Result};

pub const CLEAN_DIR: &str = "no_anomaly";
pub const ANOMALY_DIR: &str = "anomaly";
pub const MASK_PREFIX: &str = "mask_";
/// Overlays of JPEG sources are re-encoded at this quality.
pub const JPEG_QUALITY: u8 = 95;

fn basename(path: &Path) -> Result<&OsStr> {
    path.file_name().ok_or_else(|| AnnotatorError::MissingFileName {
        path: path.to_path_buf(),
    })
}

fn is_lossy(path: &Path) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .is_some_and(|e| e == "jpg" || e == "jpeg")
}

fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|e| AnnotatorError::io(dir, e))
}

fn write_overlay(img: &RgbImage, path: &Path) -> Result<()> {
    let encode_err = |source| AnnotatorError::Encode {
        path: path.to_path_buf(),
        source,
    };
    if !is_lossy(path) {
        return img.save(path).map_err(encode_err);
    }
    let file = File::create(path).map_err(|e| AnnotatorError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    img.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))
        .map_err(encode_err)?;
    writer.flush().map_err(|e| AnnotatorError::io(path, e))
}

/// Paths written for one confirmed anomaly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedAnnotation {
    pub overlay: PathBuf,
    pub mask: PathBuf,
}

/// The `annotations/` tree.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    lossless_masks: bool,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>, lossless_masks: bool) -> Self {
        Self {
            root: root.into(),
            lossless_masks,
        }
    }

    pub fn create_root(&self) -> Result<()> {
        ensure_dir(&self.root)?;
        info!("writing annotations under {}", self.root.display());
        Ok(())
    }

    pub fn clean_dir(&self) -> PathBuf {
        self.root.join(CLEAN_DIR)
    }

    pub fn anomaly_dir(&self) -> PathBuf {
        self.root.join(ANOMALY_DIR)
    }

    pub fn overlay_path(&self, source: &Path) -> Result<PathBuf> {
        Ok(self.anomaly_dir().join(basename(source)?))
    }

    pub fn mask_path(&self, source: &Path) -> Result<PathBuf> {
        let name = basename(source)?;
        let mut mask_name = std::ffi::OsString::from(MASK_PREFIX);
        if self.renames_mask(source) {
            let stem = Path::new(name).file_stem().unwrap_or(name);
            mask_name.push(stem);
            mask_name.push(".png");
        } else {
            mask_name.push(name);
        }
        Ok(self.anomaly_dir().join(mask_name))
    }

    /// True when the mask gets a different extension from its source.
    pub fn renames_mask(&self, source: &Path) -> bool {
        self.lossless_masks && is_lossy(source)
    }

    /// Byte-for-byte copy of `source` into the clean directory.
    pub fn copy_clean(&self, source: &Path) -> Result<PathBuf> {
        let dir = self.clean_dir();
        ensure_dir(&dir)?;
        let dest = dir.join(basename(source)?);
        std::fs::copy(source, &dest).map_err(|e| AnnotatorError::io(&dest, e))?;
        debug!("copied {} to {}", source.display(), dest.display());
        Ok(dest)
    }

    /// Writes the overlay and the mask. With no overlay the source file is
    /// copied verbatim in its place.
    pub fn save_anomaly(
        &self,
        source: &Path,
        overlay: Option<&RgbImage>,
        mask: &GrayImage,
    ) -> Result<SavedAnnotation> {
        ensure_dir(&self.anomaly_dir())?;

        let overlay_path = self.overlay_path(source)?;
        match overlay {
            Some(img) => write_overlay(img, &overlay_path)?,
            None => {
                std::fs::copy(source, &overlay_path)
                    .map_err(|e| AnnotatorError::io(&overlay_path, e))?;
            }
        }

        let mask_path = self.mask_path(source)?;
        mask.save(&mask_path)
            .map_err(|source| AnnotatorError::Encode {
                path: mask_path.clone(),
                source,
            })?;
        if self.renames_mask(source) {
            info!(
                "mask of lossy {} written as png: {}",
                source.display(),
                mask_path.display()
            );
        }

        info!(
            "saved {} and {}",
            overlay_path.display(),
            mask_path.display()
        );

        Ok(SavedAnnotation {
            overlay: overlay_path,
            mask: mask_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{sample_image, write_sample, ScratchDir};

    #[test]
    fn test_paths() {
        let layout = OutputLayout::new("annotations", true);
        assert_eq!(
            layout.overlay_path(Path::new("in/a.jpg")).unwrap(),
            Path::new("annotations/anomaly/a.jpg")
        );
        assert_eq!(
            layout.mask_path(Path::new("in/a.jpg")).unwrap(),
            Path::new("annotations/anomaly/mask_a.png")
        );
        assert_eq!(
            layout.mask_path(Path::new("in/b.png")).unwrap(),
            Path::new("annotations/anomaly/mask_b.png")
        );
        assert_eq!(layout.clean_dir(), Path::new("annotations/no_anomaly"));
    }

    #[test]
    fn test_mask_path_keeps_name_when_not_lossless() {
        let layout = OutputLayout::new("out", false);
        assert_eq!(
            layout.mask_path(Path::new("a.JPEG")).unwrap(),
            Path::new("out/anomaly/mask_a.JPEG")
        );
    }

    #[test]
    fn test_renames_mask() {
        let layout = OutputLayout::new("out", true);
        assert!(layout.renames_mask(Path::new("a.jpg")));
        assert!(layout.renames_mask(Path::new("a.JPEG")));
        assert!(!layout.renames_mask(Path::new("a.png")));
        assert!(!OutputLayout::new("out", false).renames_mask(Path::new("a.jpg")));
    }

    #[test]
    fn test_missing_file_name() {
        let layout = OutputLayout::new("out", true);
        assert!(matches!(
            layout.overlay_path(Path::new("/")),
            Err(AnnotatorError::MissingFileName { .. })
        ));
    }

    #[test]
    fn test_copy_clean_is_verbatim() {
        let input = ScratchDir::new("out-clean-in");
        let out = ScratchDir::new("out-clean-out");
        let src = write_sample(input.path(), "b.png", 9, 5);

        let layout = OutputLayout::new(out.join("annotations"), true);
        let dest = layout.copy_clean(&src).unwrap();

        assert_eq!(dest, out.join("annotations").join(CLEAN_DIR).join("b.png"));
        assert_eq!(std::fs::read(&src).unwrap(), std::fs::read(&dest).unwrap());
    }

    #[test]
    fn test_copy_clean_missing_source() {
        let out = ScratchDir::new("out-clean-missing");
        let layout = OutputLayout::new(out.join("annotations"), true);
        let err = layout.copy_clean(&out.join("ghost.png")).unwrap_err();
        assert!(matches!(err, AnnotatorError::Io { .. }));
    }

    #[test]
    fn test_save_anomaly_writes_pair() {
        let input = ScratchDir::new("out-pair-in");
        let out = ScratchDir::new("out-pair-out");
        let src = write_sample(input.path(), "a.png", 6, 4);

        let layout = OutputLayout::new(out.path(), true);
        let overlay = sample_image(6, 4);
        let mut mask = GrayImage::new(6, 4);
        mask.put_pixel(1, 1, image::Luma([255]));

        let saved = layout.save_anomaly(&src, Some(&overlay), &mask).unwrap();
        assert_eq!(saved.overlay, out.join("anomaly/a.png"));
        assert_eq!(saved.mask, out.join("anomaly/mask_a.png"));

        let written = image::open(&saved.mask).unwrap().to_luma8();
        assert_eq!(written, mask);
        let written = image::open(&saved.overlay).unwrap().to_rgb8();
        assert_eq!(written, overlay);
    }

    #[test]
    fn test_jpeg_overlay_uses_high_quality() {
        let input = ScratchDir::new("out-jpeg-in");
        let out = ScratchDir::new("out-jpeg-out");
        let src = write_sample(input.path(), "a.jpg", 64, 48);

        let layout = OutputLayout::new(out.path(), true);
        let overlay = sample_image(64, 48);
        let saved = layout
            .save_anomaly(&src, Some(&overlay), &GrayImage::new(64, 48))
            .unwrap();

        let mut default_quality = Vec::new();
        overlay
            .write_with_encoder(JpegEncoder::new(&mut default_quality))
            .unwrap();
        let written = std::fs::read(&saved.overlay).unwrap();
        assert!(written.len() > default_quality.len());

        let decoded = image::open(&saved.overlay).unwrap().to_rgb8();
        let total: u64 = decoded
            .pixels()
            .zip(overlay.pixels())
            .flat_map(|(a, b)| a.0.into_iter().zip(b.0).map(|(x, y)| u64::from(x.abs_diff(y))))
            .sum();
        let mean = total as f64 / (64.0 * 48.0 * 3.0);
        assert!(mean < 4.0, "mean channel error {mean}");
    }

    #[test]
    fn test_save_anomaly_without_overlay_copies_source() {
        let input = ScratchDir::new("out-copy-in");
        let out = ScratchDir::new("out-copy-out");
        let src = write_sample(input.path(), "a.jpg", 8, 8);

        let layout = OutputLayout::new(out.path(), true);
        let saved = layout
            .save_anomaly(&src, None, &GrayImage::new(8, 8))
            .unwrap();
        assert_eq!(
            std::fs::read(&src).unwrap(),
            std::fs::read(&saved.overlay).unwrap()
        );
        assert_eq!(saved.mask, out.join("anomaly/mask_a.png"));
    }
}
