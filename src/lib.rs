//! Loading of the Blood cell image dataset for supervised and self supervised training.
//!
//! Images live in `<data_path>/<split>/<class>/<file>`; every class folder becomes an
//! integer label. [`BloodDataset`] hands out single normalized images, [`SslBloodDataset`]
//! hands out a stack of augmented views per image, and [`BatchLoader`] batches either of
//! them.

pub mod config;
pub mod dataset;
pub mod error;

pub use config::DatasetArgs;
pub use dataset::common_structs::{Sample, SslItem, SupervisedItem};
pub use dataset::data_loaders::{BloodDataset, LabeledImageIndex, SslBloodDataset};
pub use dataset::data_transformers::{Compose, ImageOp, Normalize};
pub use dataset::iterator_adapters::{BatchLoader, Sampling};
pub use dataset::{DataLoader, Dataset};
pub use error::{DatasetError, Result};
