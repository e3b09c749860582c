use std::collections::HashMap;

use image::DynamicImage;
use rand::Rng;
use tch::Tensor;

use super::{load_rgb_image, LabeledImageIndex};
use crate::config::DatasetArgs;
use crate::dataset::common_structs::{SslItem, SSL_DATA_KEY};
use crate::dataset::data_transformers::{Compose, ImageOp, Normalize};
use crate::dataset::Dataset;
use crate::error::{DatasetError, Result};

pub const IDENTITY_VIEWS: usize = 1;
pub const AUGMENTED_VIEWS: usize = 3;
pub const NUM_VIEWS: usize = IDENTITY_VIEWS + AUGMENTED_VIEWS;

/// Blood images rendered as several views for self supervised training.
///
/// Every item is flipped at random once, then rendered as one deterministic view
/// followed by independently augmented ones.
#[derive(Debug, Clone)]
pub struct SslBloodDataset {
    index: LabeledImageIndex,
    shared_transform: Compose,
    identity_transform: Compose,
    augmentation_transform: Compose,
}

impl SslBloodDataset {
    pub fn new(split: &str, args: &DatasetArgs) -> Result<SslBloodDataset> {
        if args.size == 0 {
            return Err(DatasetError::InvalidConfig("size must be positive".to_string()));
        }
        let size = args.size;
        let shared_transform = Compose {
            ops: vec![
                ImageOp::RandomHorizontalFlip { p: 0.5 },
                ImageOp::RandomVerticalFlip { p: 0.5 },
            ],
            normalize: None,
        };
        let identity_transform = Compose {
            ops: vec![
                ImageOp::ResizeShorter { size },
                ImageOp::CenterCrop { size },
            ],
            normalize: Some(Normalize::blood()),
        };
        let augmentation_transform = Compose {
            ops: vec![
                ImageOp::RandomResizedCrop {
                    width: size,
                    height: size,
                    scale: (0.5, 1.),
                    ratio: (3. / 4., 4. / 3.),
                },
                ImageOp::ColorJitter {
                    brightness: 0.4,
                    contrast: 0.4,
                    saturation: 0.4,
                    hue: 0.1,
                    p: 0.8,
                },
                ImageOp::RandomGrayscale { p: 0.2 },
            ],
            normalize: Some(Normalize::blood()),
        };
        let index = LabeledImageIndex::new(&args.data_path, split)?;
        Ok(SslBloodDataset {
            index,
            shared_transform,
            identity_transform,
            augmentation_transform,
        })
    }

    pub fn index(&self) -> &LabeledImageIndex {
        &self.index
    }

    /// The views of item `index` before tensor conversion, identity view first.
    pub fn render_views<R: Rng + ?Sized>(
        &self,
        index: usize,
        rng: &mut R,
    ) -> Result<Vec<DynamicImage>> {
        let sample = self.index.get(index)?;
        let img = load_rgb_image(&sample.path)?;
        let base = self.shared_transform.apply_to_image(img, rng);
        let mut views = Vec::with_capacity(NUM_VIEWS);
        for _ in 0..IDENTITY_VIEWS {
            views.push(self.identity_transform.apply_to_image(base.clone(), rng));
        }
        for _ in 0..AUGMENTED_VIEWS {
            views.push(self.augmentation_transform.apply_to_image(base.clone(), rng));
        }
        Ok(views)
    }
}

impl Dataset for SslBloodDataset {
    type Item = SslItem;

    fn len(&self) -> usize {
        self.index.len()
    }

    fn get_with_rng<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<SslItem> {
        let label = self.index.get(index)?.label;
        let views = self.render_views(index, rng)?;
        let tensors = views
            .iter()
            .enumerate()
            .map(|(i, view)| {
                if i < IDENTITY_VIEWS {
                    self.identity_transform.finish(view)
                } else {
                    self.augmentation_transform.finish(view)
                }
            })
            .collect::<Result<Vec<Tensor>>>()?;
        let stacked = Tensor::f_stack(&tensors, 0)?;
        let mut data = HashMap::new();
        data.insert(SSL_DATA_KEY.to_string(), stacked);
        Ok(SslItem { data, label })
    }
}
