use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AnnotatorError, Result};

pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Extension check, case-insensitive.
pub fn is_image(path: &Path) -> bool {
    let Some(ext) = path.extension() else {
        return false;
    };
    let ext = ext.to_string_lossy().to_lowercase();
    IMAGE_EXTENSIONS.contains(&ext.as_str())
}

/// Reads only the header, enough to reject files that are not images at all.
fn read_header(path: &Path) -> Result<(u32, u32)> {
    image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| AnnotatorError::io(path, e))?
        .into_dimensions()
        .map_err(|source| AnnotatorError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Full decode. The format comes from the file contents, as in the header check, so a
/// file accepted at load time decodes the same way later.
pub fn decode(path: &Path) -> Result<image::DynamicImage> {
    image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| AnnotatorError::io(path, e))?
        .decode()
        .map_err(|source| AnnotatorError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

/// Ordered, immutable list of the images found in one directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet {
    dir: PathBuf,
    paths: Vec<PathBuf>,
}

impl ImageSet {
    /// Lists `dir` (non-recursive), keeping regular files with an image
    /// extension whose header can be read. Sorted by file name.
    pub fn load(dir: &Path) -> Result<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| AnnotatorError::io(dir, e))?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_image(p))
            .filter(|p| match read_header(p) {
                Ok((w, h)) => {
                    debug!("found {} ({}x{})", p.display(), w, h);
                    true
                }
                Err(e) => {
                    warn!("skipping unreadable image: {}", e);
                    false
                }
            })
            .collect();

        if paths.is_empty() {
            return Err(AnnotatorError::NoImages {
                dir: dir.to_path_buf(),
            });
        }

        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(Self {
            dir: dir.to_path_buf(),
            paths,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Path> {
        self.paths.get(index).map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}
