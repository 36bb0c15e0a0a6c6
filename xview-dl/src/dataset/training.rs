use super::*;
use crate::{
    classes::XVIEW_CLASS_MAP,
    common::*,
    config::Config,
    processor::{CacheLoader, DecodeError, RandomAffine, RandomAffineInit},
};

/// The end-to-end training sample pipeline: cached letterbox load,
/// joint affine augmentation, class remap and batch assembly.
#[derive(Debug)]
pub struct TrainingLoader<D>
where
    D: FileDataset,
{
    dataset: D,
    cache_loader: CacheLoader,
    random_affine: RandomAffine,
    image_size: usize,
    batch_size: usize,
    mean: Tensor,
    std: Tensor,
}

impl<D> TrainingLoader<D>
where
    D: FileDataset,
{
    pub fn new(config: &Config, dataset: D) -> Result<Self> {
        let image_size = config.dataset.image_size.get();
        let input_channels = dataset.input_channels();

        let cache_loader =
            CacheLoader::new(&config.preprocessor.cache_dir, image_size, input_channels)?;
        let random_affine = RandomAffineInit {
            rotate_degrees: config.preprocessor.rotate_degrees,
            translate_frac: config.preprocessor.translate_frac,
            scale: config.preprocessor.scale,
        }
        .build()?;

        ensure!(
            config.preprocessor.std.iter().all(|value| *value > 0.0),
            "standard deviation components must be positive"
        );
        let mean = per_channel_tensor(&config.preprocessor.mean);
        let std = per_channel_tensor(&config.preprocessor.std);

        Ok(Self {
            dataset,
            cache_loader,
            random_affine,
            image_size,
            batch_size: config.training.batch_size.get(),
            mean,
            std,
        })
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }

    /// Prepare one augmented sample. The returned raster is in 0-255
    /// scale; normalization happens at batch assembly.
    pub fn sample(&self, index: usize) -> Result<DataRecord> {
        let records = self.dataset.records();
        ensure!(
            index < records.len(),
            "sample index {} out of bounds ({} records)",
            index,
            records.len()
        );
        let record = &records[index];

        let (image, letterbox) = self.cache_loader.load_cache(&record.path, &record.size)?;
        let letterboxed: Vec<_> = record
            .bboxes
            .iter()
            .map(|label| letterbox.transform_label(label))
            .collect();

        let (image, pixel_labels) = self.random_affine.forward(&image, &letterboxed)?;
        let bboxes = to_ratio_labels(&pixel_labels, self.image_size).with_context(|| {
            format!("corrupted label table for '{}'", record.path.display())
        })?;

        Ok(DataRecord { image, bboxes })
    }

    /// A fresh pass over the dataset in record order. Each call starts
    /// from the first record again.
    pub fn batches(&self) -> Batches<'_, D> {
        Batches {
            loader: self,
            index: 0,
            step: 0,
        }
    }

    fn assemble(&self, records: Vec<DataRecord>, step: usize) -> TrainingRecord {
        let (images, bboxes) = records
            .into_iter()
            .map(|DataRecord { image, bboxes }| (image, bboxes))
            .unzip::<_, _, Vec<_>, Vec<_>>();

        let image = tch::no_grad(|| {
            let stacked = Tensor::stack(&images, 0);
            ((stacked - &self.mean) / &self.std).set_requires_grad(false)
        });

        TrainingRecord {
            step,
            image,
            bboxes,
        }
    }
}

impl<D> GenericDataset for TrainingLoader<D>
where
    D: FileDataset,
{
    fn input_channels(&self) -> usize {
        self.dataset.input_channels()
    }

    fn num_classes(&self) -> usize {
        self.dataset.num_classes()
    }
}

impl<D> RandomAccessDataset for TrainingLoader<D>
where
    D: FileDataset,
{
    fn num_records(&self) -> usize {
        self.dataset.records().len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        self.sample(index)
    }
}

/// Batch iterator over one pass of the dataset. Samples whose image
/// file cannot be decoded are skipped with a warning; every other
/// error ends the pass. The final batch may be short.
#[derive(Debug)]
pub struct Batches<'a, D>
where
    D: FileDataset,
{
    loader: &'a TrainingLoader<D>,
    index: usize,
    step: usize,
}

impl<D> Iterator for Batches<'_, D>
where
    D: FileDataset,
{
    type Item = Result<TrainingRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        let loader = self.loader;
        let num_records = loader.dataset.records().len();
        let mut chunk = vec![];

        while self.index < num_records && chunk.len() < loader.batch_size {
            let index = self.index;
            self.index += 1;

            match loader.sample(index) {
                Ok(record) => chunk.push(record),
                Err(err) if err.downcast_ref::<DecodeError>().is_some() => {
                    warn!("{}", err);
                }
                Err(err) => {
                    // fuse: the next call yields None
                    self.index = num_records;
                    return Some(Err(err));
                }
            }
        }

        if chunk.is_empty() {
            return None;
        }

        let step = self.step;
        self.step += 1;
        Some(Ok(loader.assemble(chunk, step)))
    }
}

fn per_channel_tensor(values: &[R64; 3]) -> Tensor {
    let values: Vec<f32> = values.iter().map(|value| value.raw() as f32).collect();
    Tensor::of_slice(&values).view([1, 3, 1, 1])
}

/// Convert augmented pixel-frame corner boxes into center-form boxes
/// normalized to `[0, 1]`, remapping raw class IDs to dense indices.
/// One unmapped ID fails the whole sample.
pub fn to_ratio_labels(labels: &[PixelLabel], image_size: usize) -> Result<Vec<RatioLabel>> {
    let scale = Transform {
        sy: r64(1.0 / image_size as f64),
        sx: r64(1.0 / image_size as f64),
        ty: r64(0.0),
        tx: r64(0.0),
    };

    labels
        .iter()
        .map(|label| -> Result<_> {
            let class = XVIEW_CLASS_MAP.to_index(label.class)?;
            let rect = &scale * &CyCxHW::from(&label.rect);
            Ok(Label { rect, class })
        })
        .try_collect()
}
