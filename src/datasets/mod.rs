pub mod adaptor;
pub mod count;
pub mod errors;
pub mod folders;
pub mod image_folder;
pub mod read_data;
pub mod split;

pub use adaptor::{DatasetOptions, ImageTensor, LabelTensor, ShardPolicy, TensorDataset};
pub use count::{class_counts, count_files, ClassCounts};
pub use errors::DatasetError;
pub use folders::{split_folders, split_output_path};
pub use image_folder::{ColorMode, ImageBatch, ImageFolder, ImageFolderBuilder, Preprocess};
pub use read_data::{read_data, PreparedData, ReadDataConfig};
pub use split::{DatasetSplit, SplitRatios};
