//! Sparse-to-dense class index mapping.

use crate::common::*;
use once_cell::sync::Lazy;

/// Sentinel for external IDs without a dense counterpart.
const UNMAPPED: i64 = -1;

/// xView class IDs 11-94 to dense indices 0-59, indexed by external ID.
#[rustfmt::skip]
const XVIEW_TABLE: [i64; 95] = [
    -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, -1, 0, 1, 2, -1, 3, -1, 4, 5, 6,
    7, 8, -1, 9, 10, 11, 12, 13, 14, 15, -1, -1, 16, 17, 18, 19, 20, 21, 22,
    -1, 23, 24, 25, -1, 26, 27, -1, 28, -1, 29, 30, 31, 32, 33, 34, 35, 36,
    37, -1, 38, 39, 40, 41, 42, 43, 44, 45, -1, -1, -1, -1, 46, 47, 48, 49,
    -1, 50, 51, -1, 52, -1, -1, -1, 53, 54, -1, 55, -1, -1, 56, -1, 57, -1,
    58, 59,
];

/// The process-wide xView class map. Built once; read-only afterwards.
pub static XVIEW_CLASS_MAP: Lazy<ClassMap> =
    Lazy::new(|| ClassMap::from_table(&XVIEW_TABLE).expect("the built-in xView class table is valid"));

/// Immutable lookup from a sparse external class ID space to a dense
/// zero-based index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    table: Vec<i64>,
    num_classes: usize,
}

impl ClassMap {
    /// Build from a lookup table indexed by external ID, with `-1`
    /// marking unmapped IDs. The mapped values must cover a contiguous
    /// `0..n` range.
    pub fn from_table(table: &[i64]) -> Result<Self> {
        let max_index = table
            .iter()
            .copied()
            .filter(|&index| index != UNMAPPED)
            .max()
            .ok_or_else(|| format_err!("the class table maps no ID at all"))?;
        ensure!(max_index >= 0, "dense indices must be non-negative");
        let num_classes = max_index as usize + 1;

        let mut seen = vec![false; num_classes];
        for &index in table {
            if index != UNMAPPED {
                ensure!(
                    (0..num_classes as i64).contains(&index),
                    "invalid dense index {} in class table",
                    index
                );
                seen[index as usize] = true;
            }
        }
        ensure!(
            seen.iter().all(|&covered| covered),
            "the dense index space has holes"
        );

        Ok(Self {
            table: table.to_vec(),
            num_classes,
        })
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Map one external ID to its dense index. An unmapped or
    /// out-of-range ID means the label table is corrupted, so it is an
    /// error rather than a silent drop.
    pub fn to_index(&self, class: i64) -> Result<usize> {
        let index = usize::try_from(class)
            .ok()
            .and_then(|class| self.table.get(class).copied())
            .unwrap_or(UNMAPPED);
        ensure!(
            index != UNMAPPED,
            "external class ID {} has no dense index",
            class
        );
        Ok(index as usize)
    }

    /// Map a sequence of external IDs, failing on the first unmapped one.
    pub fn to_indices(&self, classes: impl IntoIterator<Item = i64>) -> Result<Vec<usize>> {
        classes
            .into_iter()
            .map(|class| self.to_index(class))
            .try_collect()
    }
}
