pub mod compose;
pub mod img2tensor;

pub use compose::{Compose, ImageOp};
pub use img2tensor::{from_img_to_tensor, Normalize, BLOOD_MEAN, BLOOD_STD};
