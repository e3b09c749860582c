use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, info, warn};

use crate::dataset::common_structs::Sample;
use crate::error::{DatasetError, Result};

/// Every file of `<root>/<split>/<class>/` paired with the class label.
///
/// Class folders are sorted by name and labelled 0, 1, 2... in that order, files inside a
/// class are sorted by name too, so the same tree always gives the same index.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledImageIndex {
    class_names: Vec<String>,
    samples: Vec<Sample>,
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| DatasetError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| DatasetError::io(dir, e))?;
        paths.push(entry.path());
    }
    Ok(paths.into_iter().sorted_by(|a, b| a.file_name().cmp(&b.file_name())).collect())
}

impl LabeledImageIndex {
    pub fn new<P: AsRef<Path>>(root: P, split: &str) -> Result<LabeledImageIndex> {
        Self::scan(root.as_ref().join(split))
    }

    /// Indexes a folder whose sub folders are the classes.
    pub fn scan<P: AsRef<Path>>(split_dir: P) -> Result<LabeledImageIndex> {
        let split_dir = split_dir.as_ref().to_path_buf();
        let metadata = fs::metadata(&split_dir).map_err(|e| DatasetError::io(&split_dir, e))?;
        if !metadata.is_dir() {
            return Err(DatasetError::NotADirectory(split_dir));
        }

        let class_dirs: Vec<PathBuf> = sorted_entries(&split_dir)?
            .into_iter()
            .filter(|path| path.is_dir())
            .collect();

        let mut class_names = Vec::with_capacity(class_dirs.len());
        let mut samples = Vec::new();
        for (label, class_dir) in class_dirs.iter().enumerate() {
            let name = class_dir
                .file_name()
                .map(|name| match name.to_str() {
                    Some(name) => name.to_string(),
                    None => {
                        warn!("Class folder {:?} is not valid utf-8", class_dir);
                        name.to_string_lossy().into_owned()
                    }
                })
                .unwrap_or_default();
            let files: Vec<PathBuf> = sorted_entries(class_dir)?
                .into_iter()
                .filter(|path| !path.is_dir())
                .collect();
            debug!("Class {} ({}) has {} files", label, name, files.len());
            samples.extend(files.into_iter().map(|path| Sample {
                path,
                label: label as i64,
            }));
            class_names.push(name);
        }

        info!(
            "Indexed {:?}: {} classes, {} samples",
            split_dir,
            class_names.len(),
            samples.len()
        );
        Ok(LabeledImageIndex {
            class_names,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Folder name of every label, indexed by label
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, index: usize) -> Result<&Sample> {
        self.samples.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.samples.len(),
        })
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.samples.iter().map(|sample| sample.path.as_path())
    }

    /// Labels aligned with [`paths`](Self::paths)
    pub fn labels(&self) -> Vec<i64> {
        self.samples.iter().map(|sample| sample.label).collect()
    }
}
