use std::{fmt, fs, path::Path};

use super::{errors::DatasetError, split::DatasetSplit};

/// Number of regular files directly inside `dir`. Subdirectories are not
/// counted or entered.
pub fn count_files<P: AsRef<Path>>(dir: P) -> Result<usize, DatasetError> {
    let dir = dir.as_ref();
    let mut count = 0;
    for entry in fs::read_dir(dir).map_err(DatasetError::read_dir(dir))? {
        // follows symlinks
        if entry?.path().is_file() {
            count += 1;
        }
    }
    Ok(count)
}

/// File counts per split and class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassCounts {
    pub class_names: [String; 2],
    counts: [[usize; 2]; 3],
}

impl ClassCounts {
    pub fn get(&self, split: DatasetSplit, class: usize) -> usize {
        self.counts[split_index(split)][class]
    }

    /// `(train_0, train_1, val_0, val_1, test_0, test_1)`
    pub fn as_tuple(&self) -> (usize, usize, usize, usize, usize, usize) {
        let [[a, b], [c, d], [e, f]] = self.counts;
        (a, b, c, d, e, f)
    }

    pub fn split_total(&self, split: DatasetSplit) -> usize {
        self.counts[split_index(split)].iter().sum()
    }

    pub fn total(&self) -> usize {
        DatasetSplit::ALL.iter().map(|&s| self.split_total(s)).sum()
    }
}

impl fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_tuple())
    }
}

fn split_index(split: DatasetSplit) -> usize {
    match split {
        DatasetSplit::Train => 0,
        DatasetSplit::Val => 1,
        DatasetSplit::Test => 2,
    }
}

/// Counts the files of both classes in each of the three split directories.
///
/// Every split must contain a subfolder for each of `class_names`.
pub fn class_counts<P: AsRef<Path>>(
    train: P,
    val: P,
    test: P,
    class_names: &[String; 2],
) -> Result<ClassCounts, DatasetError> {
    let mut counts = [[0; 2]; 3];
    for (row, dir) in counts.iter_mut().zip([train, val, test]) {
        for (count, class) in row.iter_mut().zip(class_names) {
            *count = count_files(dir.as_ref().join(class))?;
        }
    }
    Ok(ClassCounts {
        class_names: class_names.clone(),
        counts,
    })
}
