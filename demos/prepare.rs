use std::time::Instant;

use dfdx::shapes::HasShape;
use image_folder_split::datasets::*;

fn main() {
    tracing_subscriber::fmt::init();

    let folder = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "./datasets/faces".to_string());
    let config = ReadDataConfig::default()
        .image_size(299, 299)
        .batch_size(32)
        .seed(0);

    let data = read_data(&folder, config).unwrap();
    println!("Count classes: {}", data.class_counts);
    for split in DatasetSplit::ALL {
        let loader = data.loader(split);
        println!(
            "{}: {} images, {} batches, classes {:?}",
            split.dir_name(),
            loader.len(),
            loader.num_batches(),
            loader.class_indices()
        );
    }

    let start = Instant::now();
    for (i, batch) in data.train_ds.iter().enumerate() {
        let (images, labels) = batch.unwrap();
        println!(
            "batch {i}: images={:?} labels={:?} | {:?}",
            images.shape(),
            labels.shape(),
            start.elapsed()
        );
    }
}
