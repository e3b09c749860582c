use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};
use tch::{Kind, Tensor};

use crate::error::{DatasetError, Result};

/// Per channel mean of the Blood dataset, in [0, 1]
pub const BLOOD_MEAN: [f32; 3] = [
    (129.377_318_88 / 255.) as f32,
    (124.105_838_64 / 255.) as f32,
    (112.477_585_69 / 255.) as f32,
];
/// Per channel standard deviation of the Blood dataset, in [0, 1]
pub const BLOOD_STD: [f32; 3] = [
    (68.209_479_49 / 255.) as f32,
    (65.431_240_43 / 255.) as f32,
    (70.458_669_94 / 255.) as f32,
];

/// Converts an image into a float CHW tensor with values in [0, 1].
pub fn from_img_to_tensor(img: &DynamicImage) -> Result<Tensor> {
    let (width, height) = img.dimensions();
    let raw_data_vec = img.to_rgb8().into_raw();
    let img_as_tensor = Tensor::f_from_slice(raw_data_vec.as_slice())?
        .f_view([height as i64, width as i64, 3])?
        .f_permute([2, 0, 1])?
        .f_to_kind(Kind::Float)?;
    Ok(img_as_tensor / 255.)
}

/// Channel wise `(x - mean) / std`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Normalize {
    pub mean: [f32; 3],
    pub std: [f32; 3],
}

impl Normalize {
    pub fn blood() -> Normalize {
        Normalize {
            mean: BLOOD_MEAN,
            std: BLOOD_STD,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.std.iter().any(|s| !(*s > 0.)) {
            return Err(DatasetError::InvalidConfig(format!(
                "normalization std must be positive, got {:?}",
                self.std
            )));
        }
        Ok(())
    }

    /// Expects a [3, H, W] tensor
    pub fn apply(&self, tensor: &Tensor) -> Result<Tensor> {
        let mean = Tensor::f_from_slice(&self.mean)?.f_view([3, 1, 1])?;
        let std = Tensor::f_from_slice(&self.std)?.f_view([3, 1, 1])?;
        Ok(tensor.f_sub(&mean)?.f_div(&std)?)
    }
}
