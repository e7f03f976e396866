//! Splits a folder of per-class images into train/val/test subsets and wraps
//! the splits in batch loaders for a binary image classifier.
//!
//! ```no_run
//! use image_folder_split::datasets::{read_data, ReadDataConfig};
//!
//! let data = read_data("faces", ReadDataConfig::default().seed(42)).unwrap();
//! println!("{}", data.class_counts);
//! for batch in data.train_ds.iter() {
//!     let (images, labels) = batch.unwrap();
//! #   let _ = (images, labels);
//! }
//! ```

pub mod datasets;
