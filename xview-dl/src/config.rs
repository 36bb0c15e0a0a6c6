//! Pipeline configuration.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    pub dataset: DatasetConfig,
    pub preprocessor: PreprocessorConfig,
    pub training: TrainingConfig,
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config = json5::from_str(&text)
            .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        Ok(config)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DatasetConfig {
    pub image_dir: PathBuf,
    pub label_file: PathBuf,
    pub classes_file: PathBuf,
    pub image_size: NonZeroUsize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreprocessorConfig {
    pub cache_dir: PathBuf,
    #[serde(default = "default_rotate_degrees")]
    pub rotate_degrees: (R64, R64),
    #[serde(default = "default_translate_frac")]
    pub translate_frac: (R64, R64),
    #[serde(default = "default_scale")]
    pub scale: (R64, R64),
    #[serde(default = "default_mean")]
    pub mean: [R64; 3],
    #[serde(default = "default_std")]
    pub std: [R64; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TrainingConfig {
    pub batch_size: NonZeroUsize,
}

fn default_rotate_degrees() -> (R64, R64) {
    (r64(-5.0), r64(5.0))
}

fn default_translate_frac() -> (R64, R64) {
    (r64(0.05), r64(0.05))
}

fn default_scale() -> (R64, R64) {
    (r64(0.95), r64(1.05))
}

/// Per-channel RGB mean of the xView training chips, 0-255 scale.
fn default_mean() -> [R64; 3] {
    [r64(60.134), r64(49.697), r64(40.746)]
}

/// Per-channel RGB standard deviation of the xView training chips.
fn default_std() -> [R64; 3] {
    [r64(29.99), r64(24.498), r64(22.046)]
}
