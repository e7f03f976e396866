use std::path::{Path, PathBuf};

use super::errors::DatasetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetSplit {
    Train,
    Val,
    Test,
}

impl DatasetSplit {
    pub const ALL: [DatasetSplit; 3] = [Self::Train, Self::Val, Self::Test];

    /// Name of the split's subdirectory.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Self::Train => "train",
            Self::Val => "val",
            Self::Test => "test",
        }
    }

    pub fn dir<P: AsRef<Path>>(&self, root: P) -> PathBuf {
        root.as_ref().join(self.dir_name())
    }
}

/// Fractions of each class that go to the train, val and test splits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitRatios {
    pub train: f64,
    pub val: f64,
    pub test: f64,
}

impl Default for SplitRatios {
    fn default() -> Self {
        Self {
            train: 0.8,
            val: 0.1,
            test: 0.1,
        }
    }
}

impl SplitRatios {
    pub fn new(train: f64, val: f64, test: f64) -> Result<Self, DatasetError> {
        let ratios = Self { train, val, test };
        ratios.validate()?;
        Ok(ratios)
    }

    pub fn validate(&self) -> Result<(), DatasetError> {
        let all = [self.train, self.val, self.test];
        if all.iter().any(|r| !(0.0..=1.0).contains(r)) {
            return Err(DatasetError::InvalidSplitRatios {
                message: format!("ratios must lie in [0, 1], got {all:?}"),
            });
        }

        // rounded to 5 places so 0.7 + 0.2 + 0.1 is accepted
        let sum: f64 = all.iter().sum();
        if (sum * 1e5).round() != 1e5 {
            return Err(DatasetError::InvalidSplitRatios {
                message: format!("ratios must sum to 1, got {sum}"),
            });
        }
        Ok(())
    }

    pub fn ratio(&self, split: DatasetSplit) -> f64 {
        match split {
            DatasetSplit::Train => self.train,
            DatasetSplit::Val => self.val,
            DatasetSplit::Test => self.test,
        }
    }

    /// Number of train and val items out of `n`; test takes the rest.
    pub fn sizes(&self, n: usize) -> [usize; 3] {
        let n_train = ((self.train * n as f64) as usize).min(n);
        let n_val = ((self.val * n as f64) as usize).min(n - n_train);
        [n_train, n_val, n - n_train - n_val]
    }
}
