// SPDX-License-Identifier: MPL-2.0

//! Storage for captured photos
//!
//! Photos are written verbatim as delivered by the camera into
//! `<pictures>/ComposeCamera2Api/IMG_<yyyyMMdd_HHmmss>.jpg`.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{error, info};

use crate::constants::storage::{
    PHOTO_EXTENSION, PHOTO_FILE_PREFIX, PHOTO_FOLDER_NAME, PHOTO_TIMESTAMP_FORMAT,
};
use crate::errors::StorageError;

/// Get the public pictures directory for saved photos
///
/// Falls back to `$HOME/Pictures` where the platform reports none.
pub fn get_photo_directory() -> Option<PathBuf> {
    dirs::picture_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Pictures")))
        .map(|pictures| pictures.join(PHOTO_FOLDER_NAME))
}

/// File name for a photo taken at `timestamp`
pub fn photo_file_name(timestamp: &DateTime<Local>) -> String {
    format!(
        "{}{}.{}",
        PHOTO_FILE_PREFIX,
        timestamp.format(PHOTO_TIMESTAMP_FORMAT),
        PHOTO_EXTENSION
    )
}

/// Writes encoded stills into the photo directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageWriter {
    output_dir: PathBuf,
}

impl ImageWriter {
    /// Writer for an explicit directory
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Writer for the public pictures directory
    pub fn default_location() -> Result<Self, StorageError> {
        get_photo_directory()
            .map(Self::new)
            .ok_or(StorageError::NoPicturesDirectory)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Save `bytes` under a timestamped name
    ///
    /// Creates the directory if needed. Returns the absolute path of the
    /// written file; every I/O failure becomes [`StorageError::WriteFailed`].
    pub async fn write(&self, bytes: Vec<u8>) -> Result<PathBuf, StorageError> {
        let filepath = self.output_dir.join(photo_file_name(&Local::now()));
        let output_dir = self.output_dir.clone();

        info!(path = %filepath.display(), size = bytes.len(), "Saving photo");

        // Write to disk in background task (I/O-bound)
        let result = tokio::task::spawn_blocking(move || -> Result<PathBuf, StorageError> {
            std::fs::create_dir_all(&output_dir)?;
            std::fs::write(&filepath, &bytes)?;
            Ok(std::path::absolute(&filepath)?)
        })
        .await
        .map_err(|e| StorageError::WriteFailed(format!("save task error: {}", e)))
        .and_then(|inner| inner);

        match &result {
            Ok(path) => info!(path = %path.display(), "Photo saved successfully"),
            Err(e) => error!(error = %e, "Photo save failed"),
        }
        result
    }
}
