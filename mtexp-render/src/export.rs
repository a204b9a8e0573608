use crate::stimulus::{GridStyle, rasterize_grid};
use mtexp_core::{ExportError, Grid, StimulusExport, StimulusKey};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Writes each trial's stimulus as a PNG for later audit
#[derive(Debug, Clone)]
pub struct PngExporter {
    directory: PathBuf,
    style: GridStyle,
}

impl PngExporter {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            style: GridStyle::default(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// `<dir>/impression-<id>-<epoch>-<idx>.png`
    pub fn path_for(&self, key: &StimulusKey) -> PathBuf {
        let id: String = key
            .experiment_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        self.directory.join(format!(
            "impression-{}-{}-{}.png",
            id, key.epoch, key.trial_index
        ))
    }
}

impl StimulusExport for PngExporter {
    fn export(&mut self, key: &StimulusKey, grid: &Grid) -> Result<(), ExportError> {
        let pixmap =
            rasterize_grid(grid, &self.style).map_err(|e| ExportError::Render(e.to_string()))?;
        let path = self.path_for(key);
        pixmap
            .save_png(&path)
            .map_err(|e| ExportError::Write {
                path: path.clone(),
                source: Box::new(e),
            })?;
        debug!(path = %path.display(), "stimulus exported");
        Ok(())
    }
}
