use std::path::Path;

use image::DynamicImage;

use crate::error::{DatasetError, Result};

pub mod blood;
pub mod labeled_image_index;
pub mod ssl_blood;

pub use blood::BloodDataset;
pub use labeled_image_index::LabeledImageIndex;
pub use ssl_blood::SslBloodDataset;

/// Decodes the file at `path` as an 8 bit RGB image, whatever its original format.
pub fn load_rgb_image(path: &Path) -> Result<DynamicImage> {
    let img = image::open(path).map_err(|source| DatasetError::ImageDecode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(DynamicImage::ImageRgb8(img.into_rgb8()))
}
