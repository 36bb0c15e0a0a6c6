//! Dataset processing toolkit.

mod dataset_;
mod record;
mod training;
mod xview_;

pub use dataset_::*;
pub use record::*;
pub use training::*;
pub use xview_::*;
