use super::*;
use crate::common::*;

/// The generic dataset trait.
pub trait GenericDataset
where
    Self: Debug + Send,
{
    /// The number of color channels of the dataset.
    fn input_channels(&self) -> usize;

    /// The number of dense classes of the dataset.
    fn num_classes(&self) -> usize;
}

/// The dataset with a list of image paths.
pub trait FileDataset
where
    Self: GenericDataset,
{
    /// Get the list of image records in the dataset.
    fn records(&self) -> &[Arc<FileRecord>];
}

/// The dataset that can be randomly accessed by sample index.
pub trait RandomAccessDataset
where
    Self: GenericDataset,
{
    fn num_records(&self) -> usize;

    /// Prepare the nth sample of the dataset.
    fn nth(&self, index: usize) -> Result<DataRecord>;
}
