use super::{Config, MediaError};
use crate::prelude::*;
use crate::util::{self, Degradable};
use crate::{err_ctx, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use std::path::{Path, PathBuf};

/// Dimensions of every composed post image
const TARGET_WIDTH: u32 = 733;
const TARGET_HEIGHT: u32 = 1076;

const WATERMARK_OPACITY: f32 = 0.3;
const LABEL_SCALE: f32 = 1.5;

pub(crate) struct Compositor {
    overlays_dir: PathBuf,
    uploads_dir: PathBuf,
}

struct ComposeJob {
    /// Unique file name of the composed image. Every job writes its own file,
    /// because the same pool image may be composed for several servers at once.
    output_name: String,
    image: PathBuf,
    watermark: PathBuf,
    label_overlay: Option<PathBuf>,
    output_dir: PathBuf,
}

impl Compositor {
    pub(crate) fn new(config: &Config) -> Self {
        Self {
            overlays_dir: config.overlays_dir.clone(),
            uploads_dir: config.uploads_dir.clone(),
        }
    }

    pub(crate) fn watermark_path(&self, server_name: &str) -> PathBuf {
        self.overlays_dir.join(server_name).join("watermark.png")
    }

    /// Crops the image to fill the post dimensions, blends the watermark over
    /// it and puts the label overlay `{overlays}/{template}/{label}.png` (if
    /// it exists) in the center.
    ///
    /// On any failure the input image path is returned as degraded.
    #[instrument(skip(self))]
    pub(crate) async fn compose(
        &self,
        image: &Path,
        watermark: &Path,
        template: &str,
        label: Option<&str>,
    ) -> Degradable<PathBuf> {
        let image = strip_quotes(image);

        let job = ComposeJob {
            output_name: output_name(&image, template),
            image: image.clone(),
            watermark: watermark.to_owned(),
            label_overlay: label.map(|label| {
                self.overlays_dir
                    .join(template)
                    .join(format!("{label}.png"))
            }),
            output_dir: self.uploads_dir.clone(),
        };

        let result = util::tokio::spawn_blocking(move || job.run())
            .with_duration_log("Composing image")
            .await;

        match result {
            Ok(output) => Degradable::Ok(output),
            Err(err) => {
                warn!(err = tracing_err(&err), "Failed to compose image");
                Degradable::Degraded(image)
            }
        }
    }
}

impl ComposeJob {
    fn run(self) -> Result<PathBuf> {
        let output = self.output_dir.join(&self.output_name);

        let mut canvas = open_image(&self.image)?
            .resize_to_fill(TARGET_WIDTH, TARGET_HEIGHT, FilterType::Lanczos3)
            .into_rgba8();

        let watermark = open_image(&self.watermark)?;
        let watermark_height = scaled(
            watermark.height(),
            canvas.width() as f32 / watermark.width().max(1) as f32,
        );
        let mut watermark = watermark
            .resize_exact(canvas.width(), watermark_height, FilterType::Lanczos3)
            .into_rgba8();

        fade(&mut watermark, WATERMARK_OPACITY);
        imageops::overlay(&mut canvas, &watermark, 0, 0);

        if let Some(label) = self.label_overlay.filter(|path| path.is_file()) {
            let label = open_image(&label)?;
            let label = label.resize_exact(
                scaled(label.width(), LABEL_SCALE),
                scaled(label.height(), LABEL_SCALE),
                FilterType::Lanczos3,
            );

            let x = (i64::from(canvas.width()) - i64::from(label.width())) / 2;
            let y = (i64::from(canvas.height()) - i64::from(label.height())) / 2;

            imageops::overlay(&mut canvas, &label.into_rgba8(), x, y);
        }

        canvas
            .save_with_format(&output, image::ImageFormat::Png)
            .map_err(err_ctx!(MediaError::Encode {
                path: output.clone()
            }))?;

        Ok(output)
    }
}

/// The format is detected from the content, because uploaded files are
/// stored without an extension.
pub(super) fn open_image(path: &Path) -> Result<DynamicImage> {
    let file = std::io::BufReader::new(fs_err::File::open(path)?);

    image::io::Reader::new(file)
        .with_guessed_format()?
        .decode()
        .map_err(err_ctx!(MediaError::Decode {
            path: path.to_owned()
        }))
}

/// `modified_{template}_{id}_{file_stem}.png`
fn output_name(image: &Path, template: &str) -> String {
    let stem = image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_owned());

    format!("modified_{template}_{}_{stem}.png", nanoid::nanoid!(6))
}

fn scaled(dimension: u32, factor: f32) -> u32 {
    ((dimension as f32 * factor).round() as u32).max(1)
}

fn fade(image: &mut RgbaImage, opacity: f32) {
    for pixel in image.pixels_mut() {
        pixel[3] = (f32::from(pixel[3]) * opacity).round() as u8;
    }
}

/// Paths may come from user input wrapped in quotes
fn strip_quotes(path: &Path) -> PathBuf {
    path.to_string_lossy().replace('"', "").into()
}
