use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dfdx::tensor::Cpu;
use tracing::info;

use super::{
    adaptor::{DatasetOptions, ShardPolicy, TensorDataset},
    count::{class_counts, ClassCounts},
    errors::DatasetError,
    folders::split_folders,
    image_folder::{ColorMode, ImageFolder, Preprocess},
    split::{DatasetSplit, SplitRatios},
};

/// Settings for [read_data].
#[derive(Debug, Clone)]
pub struct ReadDataConfig {
    /// `(height, width)` every image is resized to.
    pub image_size: (u32, u32),
    pub batch_size: usize,
    /// Usually `None`: normalisation belongs to the model.
    pub preprocess: Option<Preprocess>,
    /// Seeds both the folder split and the loader shuffles.
    pub seed: Option<u64>,
    /// Split `folder` into `<folder>_split` first. When unset, `folder`
    /// must already contain `train`, `val` and `test`.
    pub split_folder: bool,
    /// Remove an existing `<folder>_split` before splitting.
    pub delete: bool,
    pub ratios: SplitRatios,
    pub class_names: [String; 2],
    /// Color mode of the train and val loaders. The test loader is always RGB.
    pub color_mode: ColorMode,
}

impl Default for ReadDataConfig {
    fn default() -> Self {
        Self {
            image_size: (299, 299),
            batch_size: 32,
            preprocess: None,
            seed: None,
            split_folder: true,
            delete: true,
            ratios: Default::default(),
            class_names: ["Female".to_string(), "Male".to_string()],
            color_mode: ColorMode::Rgb,
        }
    }
}

impl ReadDataConfig {
    pub fn image_size(mut self, height: u32, width: u32) -> Self {
        self.image_size = (height, width);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn preprocess(mut self, preprocess: Preprocess) -> Self {
        self.preprocess = Some(preprocess);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn split_folder(mut self, split_folder: bool) -> Self {
        self.split_folder = split_folder;
        self
    }

    pub fn delete(mut self, delete: bool) -> Self {
        self.delete = delete;
        self
    }

    pub fn ratios(mut self, ratios: SplitRatios) -> Self {
        self.ratios = ratios;
        self
    }

    pub fn class_names(mut self, first: &str, second: &str) -> Self {
        self.class_names = [first.to_string(), second.to_string()];
        self
    }

    pub fn color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }
}

/// Everything [read_data] produces.
#[derive(Debug)]
pub struct PreparedData {
    pub train_ds: TensorDataset,
    pub train_loader: Arc<ImageFolder>,
    pub val_ds: TensorDataset,
    pub val_loader: Arc<ImageFolder>,
    pub test_ds: TensorDataset,
    pub test_loader: Arc<ImageFolder>,
    pub class_counts: ClassCounts,
    /// Directory holding the `train`, `val` and `test` folders.
    pub root: PathBuf,
}

impl PreparedData {
    #[allow(clippy::type_complexity)]
    pub fn into_tuple(
        self,
    ) -> (
        TensorDataset,
        Arc<ImageFolder>,
        TensorDataset,
        Arc<ImageFolder>,
        TensorDataset,
        Arc<ImageFolder>,
        ClassCounts,
    ) {
        (
            self.train_ds,
            self.train_loader,
            self.val_ds,
            self.val_loader,
            self.test_ds,
            self.test_loader,
            self.class_counts,
        )
    }

    pub fn loader(&self, split: DatasetSplit) -> &Arc<ImageFolder> {
        match split {
            DatasetSplit::Train => &self.train_loader,
            DatasetSplit::Val => &self.val_loader,
            DatasetSplit::Test => &self.test_loader,
        }
    }

    pub fn dataset(&self, split: DatasetSplit) -> &TensorDataset {
        match split {
            DatasetSplit::Train => &self.train_ds,
            DatasetSplit::Val => &self.val_ds,
            DatasetSplit::Test => &self.test_ds,
        }
    }
}

/// Splits `folder` (optionally), then builds train/val/test loaders and
/// tensor datasets over the split directories and counts their classes.
///
/// Train and val are shuffled, test keeps enumeration order. The split and
/// all three loaders share one seed, drawn at random when `config.seed` is
/// unset. Sharding is off on every dataset.
pub fn read_data<P: AsRef<Path>>(
    folder: P,
    config: ReadDataConfig,
) -> Result<PreparedData, DatasetError> {
    let folder = folder.as_ref();

    // one seed for the split and all loaders, even when none was given
    let seed = config.seed.unwrap_or_else(rand::random);
    info!("Reading {} with seed {seed}", folder.display());

    let root = if config.split_folder {
        split_folders(folder, config.ratios, config.delete, Some(seed))?
    } else {
        folder.to_path_buf()
    };

    for split in DatasetSplit::ALL {
        if !split.dir(&root).is_dir() {
            return Err(DatasetError::MissingSplit(split));
        }
    }

    let (height, width) = config.image_size;
    let loader = |split: DatasetSplit, shuffle: bool, color_mode: ColorMode| {
        ImageFolder::builder(split.dir(&root))
            .target_size(height, width)
            .batch_size(config.batch_size)
            .color_mode(color_mode)
            .shuffle(shuffle)
            .seed(Some(seed))
            .preprocess(config.preprocess)
            .build()
            .map(Arc::new)
    };

    let train_loader = loader(DatasetSplit::Train, true, config.color_mode)?;
    let val_loader = loader(DatasetSplit::Val, true, config.color_mode)?;
    let test_loader = loader(DatasetSplit::Test, false, ColorMode::Rgb)?;

    let class_counts = class_counts(
        DatasetSplit::Train.dir(&root),
        DatasetSplit::Val.dir(&root),
        DatasetSplit::Test.dir(&root),
        &config.class_names,
    )?;
    info!("Count classes: {class_counts}");

    let dev = Cpu::default();
    let options = DatasetOptions::default().shard_policy(ShardPolicy::Off);
    let dataset = |loader: &Arc<ImageFolder>| {
        TensorDataset::new(loader.clone(), dev.clone()).with_options(options)
    };

    Ok(PreparedData {
        train_ds: dataset(&train_loader)?,
        val_ds: dataset(&val_loader)?,
        test_ds: dataset(&test_loader)?,
        train_loader,
        val_loader,
        test_loader,
        class_counts,
        root,
    })
}
