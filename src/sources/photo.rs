//! Photo acquisition.
//!
//! The sidebar only needs "one photo plus its metadata, or a failure".
//! [`PhotoSource`] is that capability; [`CatalogSource`] satisfies it from a
//! JSON catalog whose entries point at remote URLs or local files.

use super::download::{DownloadConfig, DownloadError, decode_image, download_image};
use crate::render::PhotoMetadata;
use image::DynamicImage;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Photo errors
#[derive(Error, Debug)]
pub enum PhotoError {
    #[error("Failed to read photo catalog {path}: {reason}")]
    Catalog { path: String, reason: String },

    #[error("Photo catalog is empty")]
    EmptyCatalog,

    #[error("Photo download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Failed to read photo file: {0}")]
    Io(#[from] std::io::Error),

    #[error("No usable photo after {0} attempts")]
    Exhausted(usize),
}

/// A photo together with its caption text
#[derive(Debug, Clone)]
pub struct Photo {
    pub image: DynamicImage,
    pub metadata: PhotoMetadata,
}

/// Anything that can produce one photo record per call
#[allow(async_fn_in_trait)]
pub trait PhotoSource {
    async fn fetch(&self) -> Result<Photo, PhotoError>;
}

/// One catalog record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// http(s) URL or a path relative to the catalog file
    pub image: String,
}

impl CatalogEntry {
    fn metadata(&self) -> PhotoMetadata {
        PhotoMetadata::new(&self.name, &self.location, &self.description)
    }

    fn is_remote(&self) -> bool {
        self.image.starts_with("http://") || self.image.starts_with("https://")
    }
}

/// Random photo from a JSON catalog
pub struct CatalogSource {
    entries: Vec<CatalogEntry>,
    base_dir: PathBuf,
    max_attempts: usize,
    download: DownloadConfig,
}

impl CatalogSource {
    pub fn new(entries: Vec<CatalogEntry>, base_dir: PathBuf, max_attempts: usize) -> Self {
        Self {
            entries,
            base_dir,
            max_attempts: max_attempts.max(1),
            download: DownloadConfig::default(),
        }
    }

    /// Load a catalog file; relative image paths resolve against its directory
    pub fn load(path: &Path, max_attempts: usize) -> Result<Self, PhotoError> {
        let catalog_error = |reason: String| PhotoError::Catalog {
            path: path.display().to_string(),
            reason,
        };

        let content = std::fs::read_to_string(path).map_err(|e| catalog_error(e.to_string()))?;
        let mut entries: Vec<CatalogEntry> =
            serde_json::from_str(&content).map_err(|e| catalog_error(e.to_string()))?;

        // Drop duplicates, keep first occurrence
        let mut seen = std::collections::HashSet::new();
        entries.retain(|entry| seen.insert(entry.image.clone()));

        if entries.is_empty() {
            return Err(PhotoError::EmptyCatalog);
        }

        tracing::info!("Loaded {} photos from {}", entries.len(), path.display());
        let base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(Self::new(entries, base_dir, max_attempts))
    }

    async fn load_entry(&self, entry: &CatalogEntry) -> Result<DynamicImage, PhotoError> {
        if entry.is_remote() {
            return Ok(download_image(&entry.image, &self.download).await?);
        }

        let path = self.base_dir.join(&entry.image);
        tracing::info!("Reading photo from {}", path.display());
        let bytes = std::fs::read(&path)?;
        Ok(decode_image(&bytes)?)
    }
}

impl PhotoSource for CatalogSource {
    async fn fetch(&self) -> Result<Photo, PhotoError> {
        if self.entries.is_empty() {
            return Err(PhotoError::EmptyCatalog);
        }

        let attempts = self.max_attempts.min(self.entries.len());
        let picks: Vec<&CatalogEntry> = self
            .entries
            .choose_multiple(&mut rand::thread_rng(), attempts)
            .collect();

        for (attempt, entry) in picks.into_iter().enumerate() {
            tracing::info!("Fetching photo {} ({}/{})", entry.name, attempt + 1, attempts);
            match self.load_entry(entry).await {
                Ok(image) if image.width() > 0 && image.height() > 0 => {
                    return Ok(Photo {
                        image,
                        metadata: entry.metadata(),
                    });
                }
                Ok(_) => tracing::warn!("Photo {} decoded to an empty image", entry.name),
                Err(e) => tracing::warn!("Photo {} unavailable: {}", entry.name, e),
            }
        }

        Err(PhotoError::Exhausted(attempts))
    }
}
