//! Local image assets: composing the post images, picking random stock
//! images, and preparing the stock image pool.
mod compose;
mod pool;
mod prepare;

use serde::Deserialize;
use std::path::PathBuf;

pub(crate) use compose::Compositor;
pub(crate) use pool::ImagePool;
pub use prepare::{prepare_pool, PreparePoolArgs};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Config {
    /// JSON file with the server catalog
    #[serde(default = "default_servers_file")]
    pub(crate) servers_file: PathBuf,

    /// Directory with stock images for the channels without a manual upload
    #[serde(default = "default_pool_dir")]
    pub(crate) pool_dir: PathBuf,

    /// Image used when the pool is empty or missing
    #[serde(default = "default_placeholder")]
    pub(crate) placeholder: PathBuf,

    /// Directory with `{server}/watermark.png` and `{server}/{label}.png`
    #[serde(default = "default_overlays_dir")]
    pub(crate) overlays_dir: PathBuf,

    /// Working directory for uploaded and composed images. It is emptied
    /// at startup.
    #[serde(default = "default_uploads_dir")]
    pub(crate) uploads_dir: PathBuf,
}

fn default_servers_file() -> PathBuf {
    "data.json".into()
}

fn default_pool_dir() -> PathBuf {
    "random_images".into()
}

fn default_placeholder() -> PathBuf {
    "public/placeholder.png".into()
}

fn default_overlays_dir() -> PathBuf {
    "images".into()
}

fn default_uploads_dir() -> PathBuf {
    "uploads".into()
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum MediaError {
    #[error("Failed to decode the image at {path}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to encode the image to {path}")]
    Encode {
        path: PathBuf,
        source: image::ImageError,
    },
}
