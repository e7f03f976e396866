use std::{
    fs,
    path::{Path, PathBuf},
};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use tracing::{debug, info};

use super::{
    errors::DatasetError,
    split::{DatasetSplit, SplitRatios},
};

/// Where [split_folders] writes the splits of `input`: `<input>_split`.
pub fn split_output_path<P: AsRef<Path>>(input: P) -> PathBuf {
    let input = input.as_ref();
    let mut name = input
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push("_split");
    input.with_file_name(name)
}

/// Copies every class subfolder of `input` into `<input>_split/{train,val,test}/<class>`.
///
/// Each class is split on its own, so the class balance of `input` carries
/// over to every split. Within a class the files are sorted by name and
/// shuffled with `seed`, then the first `floor(train * n)` go to train, the
/// next `floor(val * n)` to val and the rest to test.
///
/// If `delete` is set, an existing output tree is removed first. Otherwise
/// files are copied over whatever is already there.
pub fn split_folders<P: AsRef<Path>>(
    input: P,
    ratios: SplitRatios,
    delete: bool,
    seed: Option<u64>,
) -> Result<PathBuf, DatasetError> {
    let input = input.as_ref();
    ratios.validate()?;

    let output = split_output_path(input);
    if delete && output.exists() {
        info!("Delete old data folder: {}", output.display());
        fs::remove_dir_all(&output)?;
    }

    let classes = list_class_dirs(input)?;
    let mut plan = Vec::with_capacity(classes.len());
    let mut total = 0;

    let seed = seed.unwrap_or_else(|| rand::thread_rng().gen());
    info!("Splitting {} with seed {seed}", input.display());
    let mut rng = StdRng::seed_from_u64(seed);

    for (class, dir) in classes {
        let mut files = list_class_files(&dir)?;
        files.shuffle(&mut rng);

        let sizes = ratios.sizes(files.len());
        debug!("class {class}: {} files split {sizes:?}", files.len());
        total += files.len();
        plan.push((class, files, sizes));
    }

    let pb = indicatif::ProgressBar::new(total as u64);
    for (class, files, sizes) in plan {
        let mut remaining = &files[..];
        for (split, n) in DatasetSplit::ALL.into_iter().zip(sizes) {
            let (chunk, rest) = remaining.split_at(n);
            remaining = rest;

            let dst_dir = split.dir(&output).join(&class);
            fs::create_dir_all(&dst_dir)?;
            for src in chunk {
                // list_class_files only returns named files
                let Some(name) = src.file_name() else { continue };
                let dst = dst_dir.join(name);
                fs::copy(src, &dst).map_err(|source| DatasetError::Copy {
                    from: src.clone(),
                    to: dst.clone(),
                    source,
                })?;
                pb.inc(1);
            }
        }
    }
    pb.finish_and_clear();

    info!("Copied {total} files to {}", output.display());
    Ok(output)
}

/// Class subdirectories of `root`, sorted by name.
pub(crate) fn list_class_dirs(root: &Path) -> Result<Vec<(String, PathBuf)>, DatasetError> {
    let mut classes = Vec::new();
    for entry in fs::read_dir(root).map_err(DatasetError::read_dir(root))? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            classes.push((name.to_owned(), path.clone()));
        }
    }
    classes.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(classes)
}

/// Regular, non-hidden files directly inside `dir`, sorted by name.
fn list_class_files(dir: &Path) -> Result<Vec<PathBuf>, DatasetError> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).map_err(DatasetError::read_dir(dir))? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        let path = entry.path();
        if !hidden && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
