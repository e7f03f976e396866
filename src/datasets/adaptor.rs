use std::sync::Arc;

use dfdx::tensor::{Cpu, Tensor, TensorFromVec};

use super::{
    errors::DatasetError,
    image_folder::{Batches, ImageFolder},
};

/// `[batch, height, width, channels]`
pub type ImageTensor = Tensor<(usize, usize, usize, usize), f32, Cpu>;
pub type LabelTensor = Tensor<(usize,), f32, Cpu>;

/// How batches are divided between workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShardPolicy {
    /// Every batch goes to the single worker.
    #[default]
    Off,
    /// Worker `index` of `num_shards` sees batches `index, index + num_shards, ...`.
    Batches { num_shards: usize, index: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatasetOptions {
    pub shard_policy: ShardPolicy,
}

impl DatasetOptions {
    pub fn shard_policy(mut self, shard_policy: ShardPolicy) -> Self {
        self.shard_policy = shard_policy;
        self
    }

    fn validate(&self) -> Result<(), DatasetError> {
        match self.shard_policy {
            ShardPolicy::Batches { num_shards, index } if index >= num_shards => {
                Err(DatasetError::InvalidShard { index, num_shards })
            }
            _ => Ok(()),
        }
    }
}

/// Serves the batches of a shared [ImageFolder] as dfdx tensors.
#[derive(Debug, Clone)]
pub struct TensorDataset {
    loader: Arc<ImageFolder>,
    dev: Cpu,
    options: DatasetOptions,
}

impl TensorDataset {
    pub fn new(loader: Arc<ImageFolder>, dev: Cpu) -> Self {
        Self {
            loader,
            dev,
            options: Default::default(),
        }
    }

    pub fn with_options(mut self, options: DatasetOptions) -> Result<Self, DatasetError> {
        options.validate()?;
        self.options = options;
        Ok(self)
    }

    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    pub fn loader(&self) -> &Arc<ImageFolder> {
        &self.loader
    }

    /// Number of batches this worker sees per epoch.
    pub fn num_batches(&self) -> usize {
        let total = self.loader.num_batches();
        match self.options.shard_policy {
            ShardPolicy::Off => total,
            ShardPolicy::Batches { num_shards, index } => {
                total / num_shards + usize::from(index < total % num_shards)
            }
        }
    }

    /// Iterates the loader's next epoch.
    pub fn iter(&self) -> TensorBatches<'_> {
        self.batches(self.loader.next_epoch())
    }

    pub fn epoch(&self, epoch: usize) -> TensorBatches<'_> {
        self.batches(self.loader.batches_for_epoch(epoch))
    }

    fn batches<'a>(&'a self, inner: Batches<'a>) -> TensorBatches<'a> {
        let (step, skip) = match self.options.shard_policy {
            ShardPolicy::Off => (1, 0),
            ShardPolicy::Batches { num_shards, index } => (num_shards, index),
        };
        TensorBatches {
            inner: inner.skip(skip).step_by(step),
            dev: &self.dev,
        }
    }
}

pub struct TensorBatches<'a> {
    inner: std::iter::StepBy<std::iter::Skip<Batches<'a>>>,
    dev: &'a Cpu,
}

impl Iterator for TensorBatches<'_> {
    type Item = Result<(ImageTensor, LabelTensor), DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        let batch = match self.inner.next()? {
            Ok(batch) => batch,
            Err(e) => return Some(Err(e)),
        };
        let [n, h, w, c] = batch.shape;
        let images = self.dev.tensor_from_vec(batch.images, (n, h, w, c));
        let labels = self.dev.tensor_from_vec(batch.labels, (n,));
        Some(Ok((images, labels)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
