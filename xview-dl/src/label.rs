use crate::common::*;
use ::label::Label;

/// A box in absolute pixel coordinates of the current frame, carrying
/// the raw external class ID.
pub type PixelLabel = Label<TLBR<R64>, i64>;

/// A finalized box in `[0, 1]` frame-ratio coordinates, carrying the
/// dense class index.
pub type RatioLabel = Label<CyCxHW<R64>, usize>;
