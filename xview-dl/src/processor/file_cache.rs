//! On-disk cache of letterboxed rasters.

use crate::{common::*, profiling::Timing};
use percent_encoding::NON_ALPHANUMERIC;

use super::{Letterbox, LetterboxTransform};

/// The error of an unreadable or undecodable image file. Samples that
/// fail with this error are skipped by the loader rather than aborting
/// the run.
#[derive(Debug)]
pub struct DecodeError {
    pub path: PathBuf,
    pub source: image::ImageError,
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to decode image file '{}': {}",
            self.path.display(),
            self.source
        )
    }
}

impl std::error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}

/// Loads chips through an on-disk cache of preprocessed rasters.
///
/// The cache stores the letterboxed square tensor in raw f32 bytes,
/// keyed by source path, channel count and canvas size. A cache entry
/// is used only when it is newer than the source file and has the
/// expected byte length; anything else falls back to decoding the
/// source and rewriting the entry.
#[derive(Debug, Clone)]
pub struct CacheLoader {
    cache_dir: PathBuf,
    image_size: usize,
    image_channels: usize,
    letterbox: Letterbox,
}

impl CacheLoader {
    pub fn new(
        cache_dir: impl AsRef<Path>,
        image_size: usize,
        image_channels: usize,
    ) -> Result<Self> {
        ensure!(image_size > 0, "image_size must be positive");
        ensure!(
            image_channels == 3,
            "image_channels other than 3 is not supported"
        );

        let cache_dir = cache_dir.as_ref().to_owned();
        fs::create_dir_all(&cache_dir)?;

        Ok(Self {
            cache_dir,
            image_size,
            image_channels,
            letterbox: Letterbox::new(image_size)?,
        })
    }

    pub fn image_size(&self) -> usize {
        self.image_size
    }

    /// Load one chip as a letterboxed `(channel, size, size)` float
    /// tensor in 0-255 scale, plus the coordinate transform computed
    /// from the recorded chip size.
    pub fn load_cache(
        &self,
        image_path: impl AsRef<Path>,
        orig_size: &HW<usize>,
    ) -> Result<(Tensor, LetterboxTransform)> {
        let Self {
            image_size,
            image_channels,
            ..
        } = *self;
        let image_path = image_path.as_ref();

        let transform = LetterboxTransform::new(orig_size.h(), orig_size.w(), image_size)?;
        let components = image_channels * image_size * image_size;
        let cache_bytes = components * std::mem::size_of::<f32>();
        let mut timing = Timing::new("cache loader");

        let cache_path = self.cache_dir.join(format!(
            "{}-{}-{}",
            percent_encoding::utf8_percent_encode(
                image_path.to_string_lossy().borrow(),
                NON_ALPHANUMERIC
            ),
            image_channels,
            image_size,
        ));

        let is_valid = if cache_path.is_file() {
            let image_modified = image_path.metadata()?.modified()?;
            let cache_meta = cache_path.metadata()?;
            let cache_modified = cache_meta.modified()?;
            cache_modified > image_modified && cache_meta.len() == cache_bytes as u64
        } else {
            false
        };

        timing.set_record("check cache validity");

        let image = if is_valid {
            let image = Tensor::f_from_file(
                cache_path.to_string_lossy().borrow(),
                false,
                Some(components as i64),
                (Kind::Float, Device::Cpu),
            )?
            .view([
                image_channels as i64,
                image_size as i64,
                image_size as i64,
            ]);

            timing.set_record("load cache");

            image
        } else {
            let decoded = image::io::Reader::open(image_path)
                .map_err(image::ImageError::IoError)
                .and_then(|reader| {
                    reader
                        .with_guessed_format()
                        .map_err(image::ImageError::IoError)
                })
                .and_then(|reader| reader.decode())
                .map_err(|source| DecodeError {
                    path: image_path.to_owned(),
                    source,
                })?;

            timing.set_record("load raw");

            let (tensor, decoded_transform) = self.letterbox.forward(&decoded)?;
            if decoded_transform != transform {
                warn!(
                    "the recorded size of '{}' disagrees with the file content",
                    image_path.display()
                );
            }

            timing.set_record("letterbox");

            let mut buffer = vec![0; cache_bytes];
            tensor.copy_data_u8(&mut buffer, components);

            // Last writer wins. A torn write fails the length or mtime
            // check on the next load and the entry is rebuilt.
            let mut writer = std::io::BufWriter::new(fs::File::create(&cache_path)?);
            writer.write_all(&buffer)?;
            writer.flush()?;

            timing.set_record("write cache");

            tensor
        };

        timing.report();

        Ok((image, transform))
    }
}
