use anyhow::{bail, Context};
use log::info;
use rayon::prelude::*;
use serde::Serialize;

use blood::dataset::data_loaders::load_rgb_image;
use blood::{DatasetArgs, LabeledImageIndex};
use tracing_subscriber::EnvFilter;

/// Running sums over the pixels of many images, values in [0, 255]
#[derive(Debug, Clone, Copy, Default)]
struct ChannelSums {
    sum: [f64; 3],
    sum_of_squares: [f64; 3],
    pixels: u64,
    images: u64,
}

impl ChannelSums {
    fn merge(mut self, other: ChannelSums) -> ChannelSums {
        for ch in 0..3 {
            self.sum[ch] += other.sum[ch];
            self.sum_of_squares[ch] += other.sum_of_squares[ch];
        }
        self.pixels += other.pixels;
        self.images += other.images;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChannelStats {
    mean: [f64; 3],
    std: [f64; 3],
    images: u64,
    pixels: u64,
}

impl From<ChannelSums> for ChannelStats {
    fn from(sums: ChannelSums) -> ChannelStats {
        let n = sums.pixels.max(1) as f64;
        let mut mean = [0.; 3];
        let mut std = [0.; 3];
        for ch in 0..3 {
            mean[ch] = sums.sum[ch] / n;
            std[ch] = (sums.sum_of_squares[ch] / n - mean[ch] * mean[ch]).max(0.).sqrt();
        }
        ChannelStats {
            mean,
            std,
            images: sums.images,
            pixels: sums.pixels,
        }
    }
}

/// Prints the per channel mean and standard deviation of a split, the numbers the
/// normalization constants come from.
fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli_args: Vec<String> = std::env::args().collect();
    if cli_args.len() != 3 {
        bail!("usage: {} <args.json> <split>", cli_args[0]);
    }
    let args = DatasetArgs::from_json_file(&cli_args[1])
        .with_context(|| format!("Error reading {}", cli_args[1]))?;
    let index = LabeledImageIndex::new(&args.data_path, &cli_args[2])?;
    info!("Computing channel statistics over {} images", index.len());

    let sums = index
        .samples()
        .par_iter()
        .map(|sample| -> anyhow::Result<ChannelSums> {
            let img = load_rgb_image(&sample.path)?.into_rgb8();
            let mut sums = ChannelSums {
                images: 1,
                pixels: img.width() as u64 * img.height() as u64,
                ..Default::default()
            };
            for pixel in img.pixels() {
                for ch in 0..3 {
                    let value = pixel[ch] as f64;
                    sums.sum[ch] += value;
                    sums.sum_of_squares[ch] += value * value;
                }
            }
            Ok(sums)
        })
        .try_reduce(ChannelSums::default, |a, b| Ok(a.merge(b)))?;

    let stats = ChannelStats::from(sums);
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
