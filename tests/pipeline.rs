use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use dfdx::shapes::HasShape;
use image::{Rgb, RgbImage};
use image_folder_split::datasets::*;

fn make_source(root: &Path, female: usize, male: usize) -> PathBuf {
    let src = root.join("faces");
    for (class, n) in [("Female", female), ("Male", male)] {
        let dir = src.join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..n {
            RgbImage::from_pixel(6, 5, Rgb([i as u8, 0, 200]))
                .save(dir.join(format!("{class}_{i:03}.png")))
                .unwrap();
        }
    }
    src
}

fn names() -> [String; 2] {
    ["Female".to_string(), "Male".to_string()]
}

fn assignment(out: &Path) -> Vec<BTreeSet<String>> {
    DatasetSplit::ALL
        .iter()
        .map(|split| {
            let mut files = BTreeSet::new();
            for class in names() {
                for entry in fs::read_dir(split.dir(out).join(&class)).unwrap() {
                    let name = entry.unwrap().file_name().to_string_lossy().into_owned();
                    files.insert(format!("{class}/{name}"));
                }
            }
            files
        })
        .collect()
}

#[test]
fn split_is_lossless_and_stratified() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 20, 10);

    let out = split_folders(&src, SplitRatios::default(), true, Some(1)).unwrap();
    assert_eq!(out, tmp.path().join("faces_split"));

    let train = DatasetSplit::Train.dir(&out);
    let val = DatasetSplit::Val.dir(&out);
    let test = DatasetSplit::Test.dir(&out);
    let counts = class_counts(&train, &val, &test, &names()).unwrap();
    assert_eq!(counts.as_tuple(), (16, 8, 2, 1, 2, 1));
    assert_eq!(counts.total(), 30);

    // copied, not moved
    assert_eq!(count_files(src.join("Female")).unwrap(), 20);
    assert_eq!(count_files(src.join("Male")).unwrap(), 10);
}

#[test]
fn split_counts_sum_for_uneven_classes() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 7, 13);
    let out = split_folders(&src, SplitRatios::default(), true, None).unwrap();
    let total: usize = assignment(&out).iter().map(|s| s.len()).sum();
    assert_eq!(total, 20);
}

#[test]
fn same_seed_gives_same_split() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 15, 15);

    let out = split_folders(&src, SplitRatios::default(), true, Some(42)).unwrap();
    let first = assignment(&out);
    let out = split_folders(&src, SplitRatios::default(), true, Some(42)).unwrap();
    let second = assignment(&out);
    assert_eq!(first, second);

    let all: BTreeSet<_> = first.iter().flatten().collect();
    assert_eq!(all.len(), 30);
}

#[test]
fn delete_flag_controls_stale_output() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 10, 10);
    let out = split_output_path(&src);
    let stale = out.join("train").join("Female").join("stale.png");

    fs::create_dir_all(stale.parent().unwrap()).unwrap();
    fs::write(&stale, b"old").unwrap();
    split_folders(&src, SplitRatios::default(), false, Some(0)).unwrap();
    assert!(stale.exists());

    split_folders(&src, SplitRatios::default(), true, Some(0)).unwrap();
    assert!(!stale.exists());
}

#[test]
fn read_data_builds_all_outputs() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 20, 10);
    let config = ReadDataConfig::default()
        .image_size(4, 3)
        .batch_size(4)
        .seed(3);

    let data = read_data(&src, config).unwrap();
    assert_eq!(data.root, tmp.path().join("faces_split"));
    assert_eq!(data.class_counts.as_tuple(), (16, 8, 2, 1, 2, 1));
    assert_eq!(data.train_loader.len(), 24);
    assert_eq!(data.train_loader.class_names(), ["Female", "Male"]);
    assert!(data.train_loader.is_shuffled());
    assert!(data.val_loader.is_shuffled());
    assert!(!data.test_loader.is_shuffled());
    assert_eq!(data.train_loader.seed(), data.test_loader.seed());

    for split in DatasetSplit::ALL {
        assert_eq!(data.dataset(split).options().shard_policy, ShardPolicy::Off);
        assert_eq!(data.loader(split).target_size(), (4, 3));
    }

    let batches: Vec<_> = data.test_ds.iter().collect::<Result<_, _>>().unwrap();
    assert_eq!(batches.len(), 1);
    let (images, labels) = &batches[0];
    assert_eq!(*images.shape(), (3, 4, 3, 3));
    assert_eq!(*labels.shape(), (3,));

    let train_batches = data.train_ds.iter().count();
    assert_eq!(train_batches, 6);

    let (_, train_loader, _, _, _, _, counts) = data.into_tuple();
    assert_eq!(train_loader.epochs_seen(), 1);
    assert_eq!(counts.total(), 30);
}

#[test]
fn test_loader_order_is_stable_across_runs() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 30, 30);
    let config = ReadDataConfig::default().image_size(2, 2).seed(9);

    let a = read_data(&src, config.clone()).unwrap();
    let a_files: Vec<PathBuf> = a.test_loader.filenames().map(Path::to_path_buf).collect();
    let a_order = a.test_loader.order(0);

    let b = read_data(&src, config).unwrap();
    let b_files: Vec<PathBuf> = b.test_loader.filenames().map(Path::to_path_buf).collect();

    assert_eq!(a_files, b_files);
    assert_eq!(a_order, b.test_loader.order(1));
    assert_eq!(a_order, (0..a_files.len()).collect::<Vec<_>>());
}

#[test]
fn read_data_on_presplit_folder() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 10, 10);

    let res = read_data(&src, ReadDataConfig::default().split_folder(false));
    assert!(matches!(
        res,
        Err(DatasetError::MissingSplit(DatasetSplit::Train))
    ));

    let out = split_folders(&src, SplitRatios::default(), true, Some(5)).unwrap();
    let data = read_data(&out, ReadDataConfig::default().split_folder(false)).unwrap();
    assert_eq!(data.root, out);
    assert_eq!(data.class_counts.total(), 20);
}

#[test]
fn read_data_with_other_class_names() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 10, 10);
    let config = ReadDataConfig::default().class_names("Cat", "Dog");
    let res = read_data(&src, config);
    assert!(matches!(res, Err(DatasetError::ReadDir { .. })));
}

#[test]
fn color_mode_applies_to_train_and_val_only() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 20, 10);
    let config = ReadDataConfig::default()
        .image_size(4, 3)
        .batch_size(4)
        .seed(11)
        .color_mode(ColorMode::Grayscale);

    let data = read_data(&src, config).unwrap();
    for split in [DatasetSplit::Train, DatasetSplit::Val] {
        let loader = data.loader(split);
        assert_eq!(loader.color_mode(), ColorMode::Grayscale);
        let batch = loader.batches_for_epoch(0).next().unwrap().unwrap();
        assert_eq!(&batch.shape[1..], [4, 3, 1]);
    }

    assert_eq!(data.test_loader.color_mode(), ColorMode::Rgb);
    let batch = data.test_loader.batches_for_epoch(0).next().unwrap().unwrap();
    assert_eq!(batch.shape, [3, 4, 3, 3]);

    let (images, _) = data.val_ds.epoch(0).next().unwrap().unwrap();
    assert_eq!(*images.shape(), (3, 4, 3, 1));
}

#[test]
fn unseeded_run_shares_one_seed() {
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 20, 10);

    let data = read_data(&src, ReadDataConfig::default().image_size(2, 2)).unwrap();
    let seed = data.train_loader.seed();
    assert_eq!(data.val_loader.seed(), seed);
    assert_eq!(data.test_loader.seed(), seed);

    // the folder split used the same seed as the loaders
    let first = assignment(&data.root);
    let out = split_folders(&src, SplitRatios::default(), true, Some(seed)).unwrap();
    assert_eq!(assignment(&out), first);
}

#[test]
fn preprocess_reaches_every_loader() {
    fn zero(px: &mut [f32]) {
        px.iter_mut().for_each(|p| *p = 0.0);
    }
    let tmp = tempfile::tempdir().unwrap();
    let src = make_source(tmp.path(), 10, 10);
    let config = ReadDataConfig::default()
        .image_size(2, 2)
        .seed(1)
        .preprocess(zero);

    let data = read_data(&src, config).unwrap();
    for split in DatasetSplit::ALL {
        let batch = data.loader(split).batches_for_epoch(0).next().unwrap().unwrap();
        assert!(batch.images.iter().all(|&p| p == 0.0));
    }
}
