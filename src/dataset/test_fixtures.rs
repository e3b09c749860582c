use std::fs;
use std::path::Path;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

/// Writes a png with a colour gradient so that crops and flips are visible
pub fn write_image(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x * 31 + y * 17) % 256) as u8,
        ])
    });
    img.save(path).unwrap();
}

/// `<root>/<split>/<class>/<file>` for each `(class, file, width, height)`
pub fn image_tree(split: &str, files: &[(&str, &str, u32, u32)]) -> TempDir {
    let root = tempfile::tempdir().unwrap();
    for (class, file, width, height) in files {
        write_image(
            &root.path().join(split).join(class).join(file),
            *width,
            *height,
        );
    }
    root
}
