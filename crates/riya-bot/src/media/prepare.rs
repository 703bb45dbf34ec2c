use super::compose::open_image;
use super::MediaError;
use crate::prelude::*;
use crate::{err_ctx, util, Result};
use image::codecs::jpeg::JpegEncoder;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Recompress a directory of images into the stock image pool
#[derive(Debug, clap::Args)]
pub struct PreparePoolArgs {
    /// Directory with the source images
    #[clap(long, default_value = "bulk")]
    input: PathBuf,

    /// Directory to write the `img_{N}.jpg` files to. It is emptied first.
    #[clap(long, default_value = "output")]
    output: PathBuf,

    /// JPEG quality from 1 to 100
    #[clap(long, default_value_t = 80, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,
}

/// Converts every image in the input directory (in the order of file names)
/// to a JPEG named `img_{N}.jpg` with sequential numbering. Files that fail
/// to convert are skipped without taking a number. Returns the number of
/// written images.
pub async fn prepare_pool(args: PreparePoolArgs) -> Result<usize> {
    info!(input = %args.input.display(), output = %args.output.display(), "Preparing image pool");

    util::fs::empty_dir(&args.output).await?;

    let mut sources = vec![];
    let mut entries = fs_err::tokio::read_dir(&args.input).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if has_image_extension(&path) && entry.file_type().await?.is_file() {
            sources.push(path);
        }
    }

    sources.sort();

    if sources.is_empty() {
        warn!(input = %args.input.display(), "No images found");
        return Ok(0);
    }

    let mut written = 0;

    for source in sources {
        let output = args.output.join(format!("img_{}.jpg", written + 1));
        let quality = args.quality;

        let result = {
            let source = source.clone();
            let output = output.clone();
            util::tokio::spawn_blocking(move || recompress(&source, &output, quality)).await
        };

        match result {
            Ok(()) => {
                info!(source = %source.display(), output = %output.display(), "Saved image");
                written += 1;
            }
            Err(err) => {
                warn!(
                    err = tracing_err(&err),
                    source = %source.display(),
                    "Failed to process image"
                );
            }
        }
    }

    info!(written, "Image pool is ready");

    Ok(written)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn recompress(source: &Path, output: &Path, quality: u8) -> Result {
    let image = open_image(source)?.into_rgb8();

    let file = std::io::BufWriter::new(fs_err::File::create(output)?);

    JpegEncoder::new_with_quality(file, quality)
        .encode_image(&image)
        .map_err(err_ctx!(MediaError::Encode {
            path: output.to_owned()
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn write_png(path: &Path) {
        RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 255]))
            .save_with_format(path, image::ImageFormat::Png)
            .unwrap();
    }

    #[test_log::test(tokio::test)]
    async fn renames_sequentially_and_skips_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("bulk");
        let output = dir.path().join("output");

        std::fs::create_dir_all(&input).unwrap();
        std::fs::create_dir_all(&output).unwrap();

        write_png(&input.join("b.png"));
        write_png(&input.join("a.JPG"));
        std::fs::write(input.join("broken.bmp"), "not an image").unwrap();
        std::fs::write(input.join("notes.txt"), "not an image either").unwrap();
        std::fs::write(output.join("stale.jpg"), "").unwrap();

        let written = prepare_pool(PreparePoolArgs {
            input,
            output: output.clone(),
            quality: 80,
        })
        .await
        .unwrap();

        assert_eq!(written, 2);

        let mut files: Vec<_> = std::fs::read_dir(&output)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .collect();
        files.sort();

        assert_eq!(files, ["img_1.jpg", "img_2.jpg"]);

        let image = image::open(output.join("img_1.jpg")).unwrap();
        assert_eq!((image.width(), image.height()), (8, 8));
    }
}
