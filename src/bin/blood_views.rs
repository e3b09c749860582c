use std::path::PathBuf;

use anyhow::{bail, Context};
use log::info;
use rand::thread_rng;

use blood::dataset::data_loaders::load_rgb_image;
use blood::{BloodDataset, DatasetArgs, SslBloodDataset};
use tracing_subscriber::EnvFilter;

/// Saves what the networks get to see for one image: the supervised input and the self
/// supervised views, before normalization.
fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli_args: Vec<String> = std::env::args().collect();
    if cli_args.len() != 5 {
        bail!("usage: {} <args.json> <split> <index> <out_dir>", cli_args[0]);
    }
    let args = DatasetArgs::from_json_file(&cli_args[1])
        .with_context(|| format!("Error reading {}", cli_args[1]))?;
    let split = &cli_args[2];
    let index: usize = cli_args[3]
        .parse()
        .with_context(|| format!("Invalid index {}", cli_args[3]))?;
    let out_dir = PathBuf::from(&cli_args[4]);
    std::fs::create_dir_all(&out_dir).context("Error creating output dir")?;

    let mut rng = thread_rng();
    let supervised = BloodDataset::new(split, &args, None)?;
    let sample = supervised.index().get(index)?;
    info!("Rendering {:?} (label {})", sample.path, sample.label);
    let img = load_rgb_image(&sample.path)?;
    let out_path = out_dir.join("supervised.png");
    supervised
        .transform()
        .apply_to_image(img, &mut rng)
        .save(&out_path)
        .with_context(|| format!("Error saving {:?}", out_path))?;

    let ssl = SslBloodDataset::new(split, &args)?;
    for (i, view) in ssl.render_views(index, &mut rng)?.iter().enumerate() {
        let out_path = out_dir.join(format!("view_{}.png", i));
        view.save(&out_path)
            .with_context(|| format!("Error saving {:?}", out_path))?;
    }
    info!("Saved views to {:?}", out_dir);
    Ok(())
}
