use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use imageproc::map::map_colors;
use rand::seq::SliceRandom;
use rand::Rng;

/// Bilinear, what the networks were trained with
pub const RESAMPLE_FILTER: FilterType = FilterType::Triangle;

// Number of (scale, ratio) samples tried by random_resized_crop before falling back to a
// central crop
const RESIZED_CROP_ATTEMPTS: usize = 10;

pub fn resize(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, RESAMPLE_FILTER)
}

/// Resizes so the shorter side is `size` pixels, keeping the aspect ratio.
pub fn resize_shorter_side(img: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = if width <= height {
        (size, (size as u64 * height as u64 / width.max(1) as u64) as u32)
    } else {
        ((size as u64 * width as u64 / height.max(1) as u64) as u32, size)
    };
    img.resize_exact(new_width, new_height.max(1), RESAMPLE_FILTER)
}

/// Surrounds the image with black borders.
pub fn pad(img: &DynamicImage, left: u32, top: u32, right: u32, bottom: u32) -> DynamicImage {
    let rgb = img.to_rgb8();
    let mut canvas = RgbImage::new(rgb.width() + left + right, rgb.height() + top + bottom);
    imageops::replace(&mut canvas, &rgb, left as i64, top as i64);
    DynamicImage::ImageRgb8(canvas)
}

/// Crops a `size`x`size` square out of the middle of the image. Images smaller than the
/// crop get zero padded first.
pub fn center_crop(img: &DynamicImage, size: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let img = if width < size || height < size {
        let pad_w = size.saturating_sub(width);
        let pad_h = size.saturating_sub(height);
        pad(img, pad_w / 2, pad_h / 2, (pad_w + 1) / 2, (pad_h + 1) / 2)
    } else {
        img.clone()
    };
    let (width, height) = img.dimensions();
    let top = ((height - size) as f64 / 2.).round() as u32;
    let left = ((width - size) as f64 / 2.).round() as u32;
    img.crop_imm(left, top, size, size)
}

/// Zero pads every side by `padding` then takes a random `size`x`size` crop.
pub fn random_crop<R: Rng + ?Sized>(
    img: &DynamicImage,
    size: u32,
    padding: u32,
    rng: &mut R,
) -> DynamicImage {
    let mut padded = pad(img, padding, padding, padding, padding);
    let (width, height) = padded.dimensions();
    if width < size || height < size {
        padded = center_crop(&padded, size.max(width).max(height));
    }
    let (width, height) = padded.dimensions();
    let top = rng.gen_range(0..=height - size);
    let left = rng.gen_range(0..=width - size);
    padded.crop_imm(left, top, size, size)
}

pub fn random_horizontal_flip<R: Rng + ?Sized>(
    img: DynamicImage,
    p: f64,
    rng: &mut R,
) -> DynamicImage {
    if rng.gen_bool(p) {
        img.fliph()
    } else {
        img
    }
}

pub fn random_vertical_flip<R: Rng + ?Sized>(
    img: DynamicImage,
    p: f64,
    rng: &mut R,
) -> DynamicImage {
    if rng.gen_bool(p) {
        img.flipv()
    } else {
        img
    }
}

/// Crops a random region whose area is a `scale` fraction of the image and whose aspect
/// ratio lies in `ratio`, then resizes it to `width`x`height`.
pub fn random_resized_crop<R: Rng + ?Sized>(
    img: &DynamicImage,
    (width, height): (u32, u32),
    scale: (f64, f64),
    ratio: (f64, f64),
    rng: &mut R,
) -> DynamicImage {
    let (img_width, img_height) = img.dimensions();
    let area = img_width as f64 * img_height as f64;
    let log_ratio = (ratio.0.ln(), ratio.1.ln());

    for _ in 0..RESIZED_CROP_ATTEMPTS {
        let target_area = area * rng.gen_range(scale.0..=scale.1);
        let aspect_ratio = rng.gen_range(log_ratio.0..=log_ratio.1).exp();
        let crop_width = (target_area * aspect_ratio).sqrt().round() as u32;
        let crop_height = (target_area / aspect_ratio).sqrt().round() as u32;
        let fits = (1..=img_width).contains(&crop_width) && (1..=img_height).contains(&crop_height);
        if fits {
            let top = rng.gen_range(0..=img_height - crop_height);
            let left = rng.gen_range(0..=img_width - crop_width);
            return img
                .crop_imm(left, top, crop_width, crop_height)
                .resize_exact(width, height, RESAMPLE_FILTER);
        }
    }

    // Fallback to a central crop clamped to the allowed ratios
    let in_ratio = img_width as f64 / img_height as f64;
    let (crop_width, crop_height) = if in_ratio < ratio.0 {
        (img_width, ((img_width as f64 / ratio.0).round() as u32).max(1))
    } else if in_ratio > ratio.1 {
        (((img_height as f64 * ratio.1).round() as u32).max(1), img_height)
    } else {
        (img_width, img_height)
    };
    let top = (img_height - crop_height) / 2;
    let left = (img_width - crop_width) / 2;
    img.crop_imm(left, top, crop_width, crop_height)
        .resize_exact(width, height, RESAMPLE_FILTER)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Jitter {
    Brightness(f32),
    Contrast(f32),
    Saturation(f32),
    Hue(f32),
}

fn blend(a: u8, b: f32, ratio: f32) -> u8 {
    (ratio * a as f32 + (1. - ratio) * b).round().max(0.).min(255.) as u8
}

fn blend_pixel(p: Rgb<u8>, target: f32, ratio: f32) -> Rgb<u8> {
    Rgb([blend(p[0], target, ratio), blend(p[1], target, ratio), blend(p[2], target, ratio)])
}

/// ITU-R 601-2 luma, same weights as PIL's "L" conversion
fn luma(p: &Rgb<u8>) -> f32 {
    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
}

fn jitter_factor<R: Rng + ?Sized>(strength: f32, rng: &mut R) -> Option<f32> {
    if strength <= 0. {
        return None;
    }
    Some(rng.gen_range((1. - strength).max(0.)..=1. + strength))
}

// Reasonable values are 0.4 for brightness, contrast and saturation, and up to 0.5 for hue
/// Randomly changes brightness, contrast, saturation and hue, in random order.
/// Each factor is drawn from `[1 - x, 1 + x]`, except hue which is a shift in
/// `[-hue, hue]` of a full turn.
pub fn color_jitter<R: Rng + ?Sized>(
    img: &DynamicImage,
    brightness: f32,
    contrast: f32,
    saturation: f32,
    hue: f32,
    rng: &mut R,
) -> DynamicImage {
    let mut jitters = Vec::with_capacity(4);
    if let Some(factor) = jitter_factor(brightness, rng) {
        jitters.push(Jitter::Brightness(factor));
    }
    if let Some(factor) = jitter_factor(contrast, rng) {
        jitters.push(Jitter::Contrast(factor));
    }
    if let Some(factor) = jitter_factor(saturation, rng) {
        jitters.push(Jitter::Saturation(factor));
    }
    if hue > 0. {
        jitters.push(Jitter::Hue(rng.gen_range(-hue..=hue)));
    }
    jitters.shuffle(rng);

    let mut rgb = img.to_rgb8();
    for jitter in jitters {
        rgb = match jitter {
            Jitter::Brightness(factor) => map_colors(&rgb, |p| blend_pixel(p, 0., factor)),
            Jitter::Contrast(factor) => {
                let pixels = (rgb.width() as f64 * rgb.height() as f64).max(1.);
                let mean = (rgb.pixels().map(|p| luma(p) as f64).sum::<f64>() / pixels) as f32;
                map_colors(&rgb, |p| blend_pixel(p, mean, factor))
            }
            Jitter::Saturation(factor) => map_colors(&rgb, |p| blend_pixel(p, luma(&p), factor)),
            Jitter::Hue(shift) => imageops::huerotate(&rgb, (shift * 360.).round() as i32),
        };
    }
    DynamicImage::ImageRgb8(rgb)
}

/// Grayscale conversion that keeps 3 identical channels.
pub fn to_grayscale(img: &DynamicImage) -> DynamicImage {
    let gray = map_colors(&img.to_rgb8(), |p| {
        let value = luma(&p).round().min(255.) as u8;
        Rgb([value, value, value])
    });
    DynamicImage::ImageRgb8(gray)
}

pub fn random_grayscale<R: Rng + ?Sized>(img: DynamicImage, p: f64, rng: &mut R) -> DynamicImage {
    if rng.gen_bool(p) {
        to_grayscale(&img)
    } else {
        img
    }
}
