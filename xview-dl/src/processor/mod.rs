//! Data preprocessing building blocks.

pub mod file_cache;
pub mod letterbox;
pub mod random_affine;

pub use file_cache::*;
pub use letterbox::*;
pub use random_affine::*;
