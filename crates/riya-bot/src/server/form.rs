use crate::prelude::*;
use crate::shorten::AdType;
use crate::Result;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use bytes::Bytes;
use std::path::{Path, PathBuf};

/// Raw fields of the `/process-bulk` form
#[derive(Debug, Default)]
pub(super) struct BulkForm {
    pub(super) server: String,
    pub(super) channel: String,
    pub(super) bulk_text: String,
    pub(super) select_type: String,
    pub(super) ad_types: Vec<AdType>,
    pub(super) label: Option<String>,
    pub(super) image: Option<Bytes>,
}

#[derive(Debug, thiserror::Error)]
pub(super) enum FormError {
    #[error("Malformed multipart body: {0}")]
    Multipart(#[from] MultipartError),

    #[error("Missing form field `{0}`")]
    MissingField(&'static str),
}

impl BulkForm {
    pub(super) async fn read(mut multipart: Multipart) -> Result<Self, FormError> {
        let mut form = Self::default();
        let mut server = None;
        let mut channel = None;

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(ToOwned::to_owned) else {
                continue;
            };

            if name == "image" {
                let bytes = field.bytes().await?;
                // Browsers send an empty part if no file was selected
                if !bytes.is_empty() {
                    form.image = Some(bytes);
                }
                continue;
            }

            let value = field.text().await?;

            match name.as_str() {
                "server" => server = Some(value),
                "channel" => channel = Some(value),
                "bulkText" => form.bulk_text = value,
                "selectType" => form.select_type = value,
                "textLabeling" => {
                    let value = value.trim();
                    form.label = (!value.is_empty()).then(|| value.to_owned());
                }
                "AdType" => match value.parse() {
                    Ok(ad_type) if !form.ad_types.contains(&ad_type) => {
                        form.ad_types.push(ad_type);
                    }
                    Ok(_) => {}
                    Err(_) => warn!(%value, "Ignoring unknown ad type"),
                },
                _ => debug!(%name, "Ignoring unknown form field"),
            }
        }

        form.server = server.ok_or(FormError::MissingField("server"))?;
        form.channel = channel.ok_or(FormError::MissingField("channel"))?;

        Ok(form)
    }
}

/// Stores the image under a random name without an extension
pub(super) async fn save_upload(uploads_dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let path = uploads_dir.join(nanoid::nanoid!());

    fs_err::tokio::create_dir_all(uploads_dir).await?;
    fs_err::tokio::write(&path, bytes).await?;

    debug!(path = %path.display(), size = bytes.len(), "Saved uploaded image");

    Ok(path)
}
