use super::*;
use crate::{classes::XVIEW_CLASS_MAP, common::*};

/// The xView satellite chip dataset.
#[derive(Debug, Clone)]
pub struct XviewDataset {
    pub classes: IndexSet<String>,
    pub records: Vec<Arc<FileRecord>>,
    pub input_channels: usize,
}

impl GenericDataset for XviewDataset {
    fn input_channels(&self) -> usize {
        self.input_channels
    }

    fn num_classes(&self) -> usize {
        self.classes.len()
    }
}

impl FileDataset for XviewDataset {
    fn records(&self) -> &[Arc<FileRecord>] {
        &self.records
    }
}

impl XviewDataset {
    /// Load the dataset from an image directory, a per-chip target
    /// table and a class-name list. Chips without a table entry get an
    /// empty box list and their size probed from the file header.
    pub fn load(
        image_dir: impl AsRef<Path>,
        label_file: impl AsRef<Path>,
        classes_file: impl AsRef<Path>,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let label_file = label_file.as_ref();
        let classes_file = classes_file.as_ref();

        let classes = load_classes_file(classes_file)?;
        ensure!(
            classes.len() == XVIEW_CLASS_MAP.num_classes(),
            "the class list in '{}' has {} entries, but the class map has {}",
            classes_file.display(),
            classes.len(),
            XVIEW_CLASS_MAP.num_classes()
        );

        let image_files = list_image_files(image_dir)?;
        let table = load_target_table(label_file)?;

        let records: Vec<_> = image_files
            .into_iter()
            .map(|path| -> Result<_> {
                let chip = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .ok_or_else(|| {
                        format_err!("invalid image file name '{}'", path.display())
                    })?;

                let record = match table.get(chip) {
                    Some(entry) => {
                        let bboxes: Vec<_> = entry
                            .targets
                            .iter()
                            .map(|target| -> Result<_> {
                                let TargetEntry {
                                    class,
                                    x1,
                                    y1,
                                    x2,
                                    y2,
                                } = *target;
                                let rect =
                                    TLBR::try_from_tlbr([r64(y1), r64(x1), r64(y2), r64(x2)])
                                        .with_context(|| {
                                            format!("invalid box in chip '{}'", chip)
                                        })?;
                                Ok(Label { rect, class })
                            })
                            .try_collect()?;

                        FileRecord {
                            path: path.clone(),
                            size: HW::from_hw([entry.height, entry.width]),
                            bboxes,
                        }
                    }
                    None => {
                        let imagesize::ImageSize { width, height } = imagesize::size(&path)
                            .map_err(|err| {
                                format_err!(
                                    "failed to probe size of '{}': {:?}",
                                    path.display(),
                                    err
                                )
                            })?;
                        FileRecord {
                            path: path.clone(),
                            size: HW::from_hw([height, width]),
                            bboxes: vec![],
                        }
                    }
                };

                Ok(Arc::new(record))
            })
            .try_collect()?;

        Ok(Self {
            classes,
            records,
            input_channels: 3,
        })
    }

    /// Load a plain directory of chips without a target table, for
    /// inference on unannotated imagery. Every record carries an empty
    /// box list; sizes come from the file headers.
    pub fn load_unlabeled(
        image_dir: impl AsRef<Path>,
        classes_file: impl AsRef<Path>,
    ) -> Result<Self> {
        let image_dir = image_dir.as_ref();
        let classes_file = classes_file.as_ref();

        let classes = load_classes_file(classes_file)?;
        ensure!(
            classes.len() == XVIEW_CLASS_MAP.num_classes(),
            "the class list in '{}' has {} entries, but the class map has {}",
            classes_file.display(),
            classes.len(),
            XVIEW_CLASS_MAP.num_classes()
        );

        let records: Vec<_> = list_image_files(image_dir)?
            .into_iter()
            .map(|path| -> Result<_> {
                let imagesize::ImageSize { width, height } =
                    imagesize::size(&path).map_err(|err| {
                        format_err!("failed to probe size of '{}': {:?}", path.display(), err)
                    })?;
                Ok(Arc::new(FileRecord {
                    path,
                    size: HW::from_hw([height, width]),
                    bboxes: vec![],
                }))
            })
            .try_collect()?;

        Ok(Self {
            classes,
            records,
            input_channels: 3,
        })
    }
}

fn list_image_files(image_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*.*", image_dir.display());
    let mut files: Vec<PathBuf> = glob::glob(&pattern)?.try_collect()?;
    files.sort();
    ensure!(
        !files.is_empty(),
        "no image files found in '{}'",
        image_dir.display()
    );
    Ok(files)
}

/// One chip row of the target table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChipEntry {
    pub id: String,
    pub width: usize,
    pub height: usize,
    pub targets: Vec<TargetEntry>,
}

/// One box row: external class ID and corner coordinates in pixels of
/// the original chip.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TargetEntry {
    pub class: i64,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

fn load_target_table(label_file: &Path) -> Result<HashMap<String, ChipEntry>> {
    let reader = BufReader::new(fs::File::open(label_file).with_context(|| {
        format!("failed to open label file '{}'", label_file.display())
    })?);
    let entries: Vec<ChipEntry> = serde_json::from_reader(reader)
        .with_context(|| format!("failed to parse label file '{}'", label_file.display()))?;

    let table: HashMap<_, _> = entries
        .into_iter()
        .map(|entry| (entry.id.clone(), entry))
        .collect();
    Ok(table)
}

pub fn load_classes_file(path: impl AsRef<Path>) -> Result<IndexSet<String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read classes file '{}'", path.display()))?;
    let lines: Vec<_> = content.lines().collect();
    let classes: IndexSet<_> = lines.iter().cloned().map(ToOwned::to_owned).collect();
    ensure!(
        lines.len() == classes.len(),
        "duplicated class names found in '{}'",
        path.display()
    );
    ensure!(
        !classes.is_empty(),
        "no classes found in '{}'",
        path.display()
    );
    Ok(classes)
}
