use super::Config;
use crate::prelude::*;
use crate::Result;
use rand::seq::SliceRandom;
use std::path::PathBuf;

/// Stock images for the channels that don't require a manual upload.
pub(crate) struct ImagePool {
    dir: PathBuf,
    placeholder: PathBuf,
}

impl ImagePool {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            dir: config.pool_dir.clone(),
            placeholder: config.placeholder.clone(),
        }
    }

    /// Picks a random file from the pool directory. Never fails, if the pool
    /// is missing or empty, then the placeholder image is returned.
    pub(crate) async fn pick(&self) -> PathBuf {
        let images = match self.list_images().await {
            Ok(images) => images,
            Err(err) => {
                warn!(
                    err = tracing_err(&err),
                    dir = %self.dir.display(),
                    "Failed to read the image pool"
                );
                return self.placeholder.clone();
            }
        };

        let picked = images.choose(&mut rand::thread_rng()).cloned();

        picked.unwrap_or_else(|| {
            warn!(dir = %self.dir.display(), "Image pool is empty");
            self.placeholder.clone()
        })
    }

    /// Hidden files and subdirectories are ignored
    async fn list_images(&self) -> Result<Vec<PathBuf>> {
        let mut entries = fs_err::tokio::read_dir(&self.dir).await?;
        let mut images = vec![];

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            if entry.file_type().await?.is_file() {
                images.push(entry.path());
            }
        }

        Ok(images)
    }
}
