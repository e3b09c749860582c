use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tch::Tensor;
/// Frequently used structs in the provided data loaders/adapters

/// An image file with the class it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub path: PathBuf,
    pub label: i64,
}

/// What the supervised dataset hands out: a [3, H, W] image, its label and where it came from
#[derive(Debug)]
pub struct SupervisedItem {
    pub image: Tensor,
    pub label: i64,
    pub path: PathBuf,
}

/// Key of the stacked views in [`SslItem::data`]
pub const SSL_DATA_KEY: &str = "data";

/// What the self supervised dataset hands out: the [VIEWS, 3, H, W] stack under
/// [`SSL_DATA_KEY`] and the label
#[derive(Debug)]
pub struct SslItem {
    pub data: HashMap<String, Tensor>,
    pub label: i64,
}

impl SslItem {
    pub fn views(&self) -> Option<&Tensor> {
        self.data.get(SSL_DATA_KEY)
    }
}
