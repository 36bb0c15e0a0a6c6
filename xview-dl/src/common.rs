pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use slice_of_array::SliceFlatExt as _;
pub use std::{
    borrow::Borrow,
    collections::HashMap,
    fmt,
    fmt::Debug,
    fs,
    io::{BufReader, Write as _},
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};
pub use tch::{Device, IndexOp, Kind, Tensor};
pub use tch_tensor_like::TensorLike;

pub use crate::label::{PixelLabel, RatioLabel};
pub use ::label::Label;
pub use bbox::{prelude::*, Affine, CyCxHW, Transform, HW, TLBR};
