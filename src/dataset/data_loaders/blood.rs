use rand::Rng;

use super::{load_rgb_image, LabeledImageIndex};
use crate::config::DatasetArgs;
use crate::dataset::common_structs::SupervisedItem;
use crate::dataset::data_transformers::{Compose, ImageOp, Normalize};
use crate::dataset::Dataset;
use crate::error::Result;

/// Side of the images fed to the supervised network
pub const IMAGE_SIZE: u32 = 84;
/// Extra pixels added before the random train crop
const TRAIN_RESIZE_MARGIN: u32 = 12;
const TRAIN_CROP_PADDING: u32 = 8;

pub fn is_train_split(split: &str) -> bool {
    split == "train" || split == "trainval"
}

/// Labelled Blood images for supervised training and evaluation.
#[derive(Debug, Clone)]
pub struct BloodDataset {
    index: LabeledImageIndex,
    transform: Compose,
}

impl BloodDataset {
    /// Indexes `<args.data_path>/<split>`.
    ///
    /// The pipeline is, in order of preference: `transform`, `args.transform`, then
    /// [`default_transform`](Self::default_transform) for the split. A custom pipeline is
    /// used as is, it is not extended with the default normalization.
    pub fn new(
        split: &str,
        args: &DatasetArgs,
        transform: Option<Compose>,
    ) -> Result<BloodDataset> {
        let transform = match transform.or_else(|| args.transform.clone()) {
            Some(custom) => {
                custom.validate()?;
                custom
            }
            None => Self::default_transform(split),
        };
        let index = LabeledImageIndex::new(&args.data_path, split)?;
        Ok(BloodDataset { index, transform })
    }

    /// Augmented random crops for `train`/`trainval`, a plain resize for every other split.
    pub fn default_transform(split: &str) -> Compose {
        let ops = if is_train_split(split) {
            vec![
                ImageOp::Resize {
                    width: IMAGE_SIZE + TRAIN_RESIZE_MARGIN,
                    height: IMAGE_SIZE + TRAIN_RESIZE_MARGIN,
                },
                ImageOp::RandomCrop {
                    size: IMAGE_SIZE,
                    padding: TRAIN_CROP_PADDING,
                },
                ImageOp::RandomHorizontalFlip { p: 0.5 },
            ]
        } else {
            vec![
                ImageOp::Resize {
                    width: IMAGE_SIZE,
                    height: IMAGE_SIZE,
                },
                ImageOp::CenterCrop { size: IMAGE_SIZE },
            ]
        };
        Compose {
            ops,
            normalize: Some(Normalize::blood()),
        }
    }

    pub fn index(&self) -> &LabeledImageIndex {
        &self.index
    }

    pub fn transform(&self) -> &Compose {
        &self.transform
    }
}

impl Dataset for BloodDataset {
    type Item = SupervisedItem;

    fn len(&self) -> usize {
        self.index.len()
    }

    fn get_with_rng<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<SupervisedItem> {
        let sample = self.index.get(index)?;
        let img = load_rgb_image(&sample.path)?;
        let image = self.transform.apply(img, rng)?;
        Ok(SupervisedItem {
            image,
            label: sample.label,
            path: sample.path.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::data_augmenters::image_augmentations::{center_crop, resize};
    use crate::dataset::data_loaders::load_rgb_image;
    use crate::dataset::data_transformers::from_img_to_tensor;
    use crate::dataset::test_fixtures::image_tree;
    use crate::error::DatasetError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const FILES: &[(&str, &str, u32, u32)] = &[
        ("basophil", "a.png", 120, 90),
        ("basophil", "b.png", 20, 200),
        ("neutrophil", "c.png", 84, 84),
        ("neutrophil", "d.png", 7, 3),
    ];

    #[test]
    fn eval_images_are_84x84() {
        let root = image_tree("test", FILES);
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        assert_eq!(dataset.len(), 4);
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            assert_eq!(item.image.size(), vec![3, 84, 84]);
            assert_eq!(item.label, if i < 2 { 0 } else { 1 });
            assert_eq!(&item.path, &dataset.index().samples()[i].path);
        }
    }

    #[test]
    fn train_pipeline_crops_and_flips() {
        let expected = Compose {
            ops: vec![
                ImageOp::Resize {
                    width: 96,
                    height: 96,
                },
                ImageOp::RandomCrop {
                    size: 84,
                    padding: 8,
                },
                ImageOp::RandomHorizontalFlip { p: 0.5 },
            ],
            normalize: Some(Normalize::blood()),
        };
        assert_eq!(BloodDataset::default_transform("train"), expected);
        assert_eq!(BloodDataset::default_transform("trainval"), expected);
    }

    #[test]
    fn eval_pipeline_resizes_and_center_crops() {
        let expected = Compose {
            ops: vec![
                ImageOp::Resize {
                    width: 84,
                    height: 84,
                },
                ImageOp::CenterCrop { size: 84 },
            ],
            normalize: Some(Normalize::blood()),
        };
        for split in &["test", "val", "holdout"] {
            assert_eq!(BloodDataset::default_transform(split), expected);
        }
    }

    #[test]
    fn eval_images_are_normalized() {
        let root = image_tree("test", FILES);
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        for i in 0..dataset.len() {
            let item = dataset.get(i).unwrap();
            let img = load_rgb_image(&item.path).unwrap();
            let resized = center_crop(&resize(&img, 84, 84), 84);
            let unnormalized = from_img_to_tensor(&resized).unwrap();
            let expected = Normalize::blood().apply(&unnormalized).unwrap();
            let diff = (&item.image - &expected).abs().max().double_value(&[]);
            assert!(diff < 1e-5, "item {} differs by {}", i, diff);
            // Normalization moves values outside of [0, 1]
            assert!(!item.image.allclose(&unnormalized, 1e-5, 1e-5, false));
        }
    }

    #[test]
    fn eval_is_deterministic() {
        let root = image_tree("val", FILES);
        let dataset = BloodDataset::new("val", &DatasetArgs::new(root.path()), None).unwrap();
        let first = dataset.get(0).unwrap().image;
        let second = dataset.get(0).unwrap().image;
        assert!(first.equal(&second));
    }

    #[test]
    fn train_images_are_84x84() {
        let root = image_tree("trainval", FILES);
        let dataset = BloodDataset::new("trainval", &DatasetArgs::new(root.path()), None).unwrap();
        assert_eq!(dataset.transform(), &BloodDataset::default_transform("train"));
        let mut rng = StdRng::seed_from_u64(42);
        for i in 0..dataset.len() {
            let item = dataset.get_with_rng(i, &mut rng).unwrap();
            assert_eq!(item.image.size(), vec![3, 84, 84]);
        }
    }

    #[test]
    fn unknown_split_uses_eval_pipeline() {
        let root = image_tree("holdout", FILES);
        let dataset = BloodDataset::new("holdout", &DatasetArgs::new(root.path()), None).unwrap();
        assert_eq!(dataset.transform(), &BloodDataset::default_transform("test"));
    }

    #[test]
    fn custom_transform_is_honored() {
        let root = image_tree("test", FILES);
        let custom = Compose::new(
            vec![ImageOp::Resize {
                width: 32,
                height: 16,
            }],
            None,
        )
        .unwrap();
        let args = DatasetArgs::new(root.path());
        let dataset = BloodDataset::new("test", &args, Some(custom.clone())).unwrap();
        assert_eq!(dataset.transform(), &custom);
        let item = dataset.get(1).unwrap();
        assert_eq!(item.image.size(), vec![3, 16, 32]);
        // Not normalized, still in [0, 1]
        assert!(item.image.min().double_value(&[]) >= 0.);
        assert!(item.image.max().double_value(&[]) <= 1.);
    }

    #[test]
    fn explicit_transform_wins_over_args() {
        let root = image_tree("test", FILES);
        let from_args = Compose::new(vec![ImageOp::CenterCrop { size: 10 }], None).unwrap();
        let explicit = Compose::new(vec![ImageOp::CenterCrop { size: 12 }], None).unwrap();
        let args = DatasetArgs::new(root.path()).with_transform(from_args.clone());
        let dataset = BloodDataset::new("test", &args, None).unwrap();
        assert_eq!(dataset.transform(), &from_args);
        let dataset = BloodDataset::new("test", &args, Some(explicit.clone())).unwrap();
        assert_eq!(dataset.transform(), &explicit);
    }

    #[test]
    fn invalid_custom_transform_is_rejected() {
        let root = image_tree("test", FILES);
        let custom = Compose {
            ops: vec![ImageOp::RandomGrayscale { p: 2. }],
            normalize: None,
        };
        let result = BloodDataset::new("test", &DatasetArgs::new(root.path()), Some(custom));
        assert!(matches!(result, Err(DatasetError::InvalidConfig(_))));
    }

    #[test]
    fn corrupt_image_fails_on_access() {
        let root = image_tree("test", FILES);
        let corrupt = root.path().join("test").join("neutrophil").join("e.png");
        std::fs::write(corrupt, b"garbage").unwrap();
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        assert_eq!(dataset.len(), 5);
        assert!(dataset.get(3).is_ok());
        assert!(matches!(dataset.get(4), Err(DatasetError::ImageDecode { .. })));
        assert!(matches!(
            dataset.get(5),
            Err(DatasetError::IndexOutOfRange { index: 5, len: 5 })
        ));
    }

    #[test]
    fn missing_split_fails_at_construction() {
        let root = image_tree("train", FILES);
        let result = BloodDataset::new("test", &DatasetArgs::new(root.path()), None);
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }
}
