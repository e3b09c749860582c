use image::DynamicImage;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tch::Tensor;

use super::img2tensor::{from_img_to_tensor, Normalize};
use crate::dataset::data_augmenters::image_augmentations::*;
use crate::error::{DatasetError, Result};

/// A single image to image step of a preprocessing pipeline.
///
/// Serialized with an `op` tag, e.g. `{"op": "random_crop", "size": 84, "padding": 8}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ImageOp {
    Resize {
        width: u32,
        height: u32,
    },
    /// Shorter side becomes `size`, aspect ratio kept
    ResizeShorter {
        size: u32,
    },
    CenterCrop {
        size: u32,
    },
    RandomCrop {
        size: u32,
        #[serde(default)]
        padding: u32,
    },
    RandomHorizontalFlip {
        p: f64,
    },
    RandomVerticalFlip {
        p: f64,
    },
    RandomResizedCrop {
        width: u32,
        height: u32,
        scale: (f64, f64),
        ratio: (f64, f64),
    },
    /// Applied as a whole with probability `p`
    ColorJitter {
        brightness: f32,
        contrast: f32,
        saturation: f32,
        hue: f32,
        p: f64,
    },
    RandomGrayscale {
        p: f64,
    },
}

fn check_probability(op: &str, p: f64) -> Result<()> {
    if (0. ..=1.).contains(&p) {
        Ok(())
    } else {
        Err(DatasetError::InvalidConfig(format!(
            "{} probability must be in [0, 1], got {}",
            op, p
        )))
    }
}

fn check_positive(op: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(DatasetError::InvalidConfig(format!("{} size must be positive", op)));
    }
    Ok(())
}

fn check_range(op: &str, name: &str, (low, high): (f64, f64)) -> Result<()> {
    if low > 0. && low <= high && high.is_finite() {
        Ok(())
    } else {
        Err(DatasetError::InvalidConfig(format!(
            "{} {} must satisfy 0 < low <= high, got ({}, {})",
            op, name, low, high
        )))
    }
}

impl ImageOp {
    pub fn apply<R: Rng + ?Sized>(&self, img: DynamicImage, rng: &mut R) -> DynamicImage {
        match *self {
            ImageOp::Resize { width, height } => resize(&img, width, height),
            ImageOp::ResizeShorter { size } => resize_shorter_side(&img, size),
            ImageOp::CenterCrop { size } => center_crop(&img, size),
            ImageOp::RandomCrop { size, padding } => random_crop(&img, size, padding, rng),
            ImageOp::RandomHorizontalFlip { p } => random_horizontal_flip(img, p, rng),
            ImageOp::RandomVerticalFlip { p } => random_vertical_flip(img, p, rng),
            ImageOp::RandomResizedCrop {
                width,
                height,
                scale,
                ratio,
            } => random_resized_crop(&img, (width, height), scale, ratio, rng),
            ImageOp::ColorJitter {
                brightness,
                contrast,
                saturation,
                hue,
                p,
            } => {
                if rng.gen_bool(p) {
                    color_jitter(&img, brightness, contrast, saturation, hue, rng)
                } else {
                    img
                }
            }
            ImageOp::RandomGrayscale { p } => random_grayscale(img, p, rng),
        }
    }

    /// Catches parameters that would make `apply` panic or produce empty images.
    pub fn validate(&self) -> Result<()> {
        match *self {
            ImageOp::Resize { width, height } => {
                check_positive("resize", width)?;
                check_positive("resize", height)
            }
            ImageOp::ResizeShorter { size } => check_positive("resize_shorter", size),
            ImageOp::CenterCrop { size } => check_positive("center_crop", size),
            ImageOp::RandomCrop { size, .. } => check_positive("random_crop", size),
            ImageOp::RandomHorizontalFlip { p } => check_probability("random_horizontal_flip", p),
            ImageOp::RandomVerticalFlip { p } => check_probability("random_vertical_flip", p),
            ImageOp::RandomResizedCrop {
                width,
                height,
                scale,
                ratio,
            } => {
                check_positive("random_resized_crop", width)?;
                check_positive("random_resized_crop", height)?;
                check_range("random_resized_crop", "scale", scale)?;
                check_range("random_resized_crop", "ratio", ratio)
            }
            ImageOp::ColorJitter {
                brightness,
                contrast,
                saturation,
                hue,
                p,
            } => {
                if [brightness, contrast, saturation].iter().any(|v| !(*v >= 0.)) {
                    return Err(DatasetError::InvalidConfig(
                        "color_jitter strengths must be non negative".to_string(),
                    ));
                }
                if !(0. ..=0.5).contains(&hue) {
                    return Err(DatasetError::InvalidConfig(format!(
                        "color_jitter hue must be in [0, 0.5], got {}",
                        hue
                    )));
                }
                check_probability("color_jitter", p)
            }
            ImageOp::RandomGrayscale { p } => check_probability("random_grayscale", p),
        }
    }
}

/// Image ops applied in order, followed by the conversion to a float CHW tensor and an
/// optional normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compose {
    pub ops: Vec<ImageOp>,
    #[serde(default)]
    pub normalize: Option<Normalize>,
}

impl Compose {
    pub fn new(ops: Vec<ImageOp>, normalize: Option<Normalize>) -> Result<Compose> {
        let compose = Compose { ops, normalize };
        compose.validate()?;
        Ok(compose)
    }

    pub fn validate(&self) -> Result<()> {
        for op in &self.ops {
            op.validate()?;
        }
        if let Some(normalize) = &self.normalize {
            normalize.validate()?;
        }
        Ok(())
    }

    /// Runs only the image ops, useful to look at what the network gets to see.
    pub fn apply_to_image<R: Rng + ?Sized>(&self, img: DynamicImage, rng: &mut R) -> DynamicImage {
        self.ops.iter().fold(img, |img, op| op.apply(img, rng))
    }

    /// Tensor conversion and normalization, without the image ops.
    pub fn finish(&self, img: &DynamicImage) -> Result<Tensor> {
        let tensor = from_img_to_tensor(img)?;
        match &self.normalize {
            Some(normalize) => normalize.apply(&tensor),
            None => Ok(tensor),
        }
    }

    pub fn apply<R: Rng + ?Sized>(&self, img: DynamicImage, rng: &mut R) -> Result<Tensor> {
        let img = self.apply_to_image(img, rng);
        self.finish(&img)
    }
}
