use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use image::imageops::FilterType;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::debug;

use super::{errors::DatasetError, folders::list_class_dirs};

/// In-place transform applied to every decoded sample.
pub type Preprocess = fn(&mut [f32]);

const EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "ppm", "tif", "tiff"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColorMode {
    #[default]
    Rgb,
    Rgba,
    Grayscale,
}

impl ColorMode {
    pub fn channels(&self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
            Self::Grayscale => 1,
        }
    }
}

/// One batch in channels-last layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBatch {
    pub images: Vec<f32>,
    pub labels: Vec<f32>,
    /// `[batch, height, width, channels]`
    pub shape: [usize; 4],
}

impl ImageBatch {
    pub fn len(&self) -> usize {
        self.shape[0]
    }

    pub fn is_empty(&self) -> bool {
        self.shape[0] == 0
    }
}

pub struct ImageFolderBuilder {
    dir: PathBuf,
    target_size: (u32, u32),
    batch_size: usize,
    color_mode: ColorMode,
    shuffle: bool,
    seed: Option<u64>,
    preprocess: Option<Preprocess>,
}

impl ImageFolderBuilder {
    /// Images are resized to `(height, width)`.
    pub fn target_size(mut self, height: u32, width: u32) -> Self {
        self.target_size = (height, width);
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn color_mode(mut self, color_mode: ColorMode) -> Self {
        self.color_mode = color_mode;
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn preprocess(mut self, preprocess: Option<Preprocess>) -> Self {
        self.preprocess = preprocess;
        self
    }

    pub fn build(self) -> Result<ImageFolder, DatasetError> {
        if self.batch_size == 0 {
            return Err(DatasetError::InvalidBatchSize);
        }

        let mut class_names = Vec::new();
        let mut samples = Vec::new();
        for (label, (name, dir)) in list_class_dirs(&self.dir)?.into_iter().enumerate() {
            let mut paths = Vec::new();
            collect_images(&dir, &mut paths)?;
            samples.extend(paths.into_iter().map(|p| (p, label)));
            class_names.push(name);
        }
        debug!(
            "Found {} images belonging to {} classes in {}",
            samples.len(),
            class_names.len(),
            self.dir.display()
        );

        Ok(ImageFolder {
            dir: self.dir,
            class_names,
            samples,
            target_size: self.target_size,
            batch_size: self.batch_size,
            color_mode: self.color_mode,
            shuffle: self.shuffle,
            seed: self.seed.unwrap_or_else(|| rand::thread_rng().gen()),
            preprocess: self.preprocess,
            epoch: AtomicUsize::new(0),
        })
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Images of `dir` sorted by name, then those of its subdirectories in name
/// order. Symlinked directories are not entered.
fn collect_images(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), DatasetError> {
    let mut files = Vec::new();
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(DatasetError::read_dir(dir))? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            subdirs.push(path);
        } else if is_image(&path) {
            files.push(path);
        }
    }
    files.sort();
    subdirs.sort();

    out.extend(files);
    for sub in subdirs {
        collect_images(&sub, out)?;
    }
    Ok(())
}

/// Batches of labelled images read from a directory with one subfolder per
/// class. Labels are the indices of the class folders sorted by name.
#[derive(Debug)]
pub struct ImageFolder {
    dir: PathBuf,
    class_names: Vec<String>,
    samples: Vec<(PathBuf, usize)>,
    target_size: (u32, u32),
    batch_size: usize,
    color_mode: ColorMode,
    shuffle: bool,
    seed: u64,
    preprocess: Option<Preprocess>,
    epoch: AtomicUsize,
}

impl ImageFolder {
    pub fn builder<P: AsRef<Path>>(dir: P) -> ImageFolderBuilder {
        ImageFolderBuilder {
            dir: dir.as_ref().to_path_buf(),
            target_size: (256, 256),
            batch_size: 32,
            color_mode: ColorMode::Rgb,
            shuffle: true,
            seed: None,
            preprocess: None,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn num_batches(&self) -> usize {
        self.samples.len().div_ceil(self.batch_size)
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// `(height, width)`
    pub fn target_size(&self) -> (u32, u32) {
        self.target_size
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color_mode
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffle
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn class_indices(&self) -> HashMap<String, usize> {
        self.class_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect()
    }

    /// Sample paths in enumeration (unshuffled) order.
    pub fn filenames(&self) -> impl Iterator<Item = &Path> {
        self.samples.iter().map(|(p, _)| p.as_path())
    }

    pub fn labels(&self) -> Vec<f32> {
        self.samples.iter().map(|&(_, l)| l as f32).collect()
    }

    pub fn label(&self, index: usize) -> f32 {
        self.samples[index].1 as f32
    }

    /// Decodes sample `index` as `[height, width, channels]` pixels in `0..=255`.
    pub fn load(&self, index: usize) -> Result<Vec<f32>, DatasetError> {
        let path = &self.samples[index].0;
        let img = image::open(path).map_err(|source| DatasetError::Image {
            path: path.clone(),
            source,
        })?;

        let (height, width) = self.target_size;
        let img = img.resize_exact(width, height, FilterType::Nearest);
        let raw = match self.color_mode {
            ColorMode::Rgb => img.into_rgb8().into_raw(),
            ColorMode::Rgba => img.into_rgba8().into_raw(),
            ColorMode::Grayscale => img.into_luma8().into_raw(),
        };

        let mut pixels: Vec<f32> = raw.into_iter().map(f32::from).collect();
        if let Some(preprocess) = self.preprocess {
            preprocess(&mut pixels);
        }
        Ok(pixels)
    }

    /// Sample order of `epoch`. Unshuffled folders always use enumeration order.
    pub fn order(&self, epoch: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.samples.len()).collect();
        if self.shuffle {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            order.shuffle(&mut rng);
        }
        order
    }

    pub fn batch(&self, indices: &[usize]) -> Result<ImageBatch, DatasetError> {
        let (height, width) = self.target_size;
        let (height, width) = (height as usize, width as usize);
        let channels = self.color_mode.channels();

        let mut images = Vec::with_capacity(indices.len() * height * width * channels);
        let mut labels = Vec::with_capacity(indices.len());
        for &i in indices {
            images.extend(self.load(i)?);
            labels.push(self.label(i));
        }

        Ok(ImageBatch {
            images,
            labels,
            shape: [indices.len(), height, width, channels],
        })
    }

    pub fn batches_for_epoch(&self, epoch: usize) -> Batches<'_> {
        Batches {
            folder: self,
            order: self.order(epoch),
            pos: 0,
        }
    }

    /// Iterates the next epoch; every call reshuffles a shuffled folder.
    pub fn next_epoch(&self) -> Batches<'_> {
        let epoch = self.epoch.fetch_add(1, Ordering::Relaxed);
        self.batches_for_epoch(epoch)
    }

    pub fn epochs_seen(&self) -> usize {
        self.epoch.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.epoch.store(0, Ordering::Relaxed);
    }
}

impl dfdx::data::ExactSizeDataset for ImageFolder {
    type Item<'a> = Result<(Vec<f32>, f32), DatasetError> where Self: 'a;
    fn get(&self, index: usize) -> Self::Item<'_> {
        Ok((self.load(index)?, self.label(index)))
    }
    fn len(&self) -> usize {
        self.samples.len()
    }
}

pub struct Batches<'a> {
    folder: &'a ImageFolder,
    order: Vec<usize>,
    pos: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<ImageBatch, DatasetError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.folder.batch_size).min(self.order.len());
        let batch = self.folder.batch(&self.order[self.pos..end]);
        self.pos = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = (self.order.len() - self.pos).div_ceil(self.folder.batch_size);
        (left, Some(left))
    }
}

impl ExactSizeIterator for Batches<'_> {}
