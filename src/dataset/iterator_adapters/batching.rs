use std::path::PathBuf;
use std::time::Instant;

use log::debug;
use rayon::prelude::*;
use tch::Tensor;

use super::shuffling::{sample_indices, Sampling};
use crate::dataset::common_structs::{SslItem, SupervisedItem, SSL_DATA_KEY};
use crate::dataset::{DataLoader, Dataset};
use crate::error::{DatasetError, Result};

/// Items that can be merged into a single batch
pub trait Collate: Sized {
    type Batch;
    fn collate(items: Vec<Self>) -> Result<Self::Batch>;
}

/// `images` is [B, 3, H, W], `labels` is an int64 [B] tensor
#[derive(Debug)]
pub struct SupervisedBatch {
    pub images: Tensor,
    pub labels: Tensor,
    pub paths: Vec<PathBuf>,
}

/// `views` is [B, VIEWS, 3, H, W], `labels` is an int64 [B] tensor
#[derive(Debug)]
pub struct SslBatch {
    pub views: Tensor,
    pub labels: Tensor,
}

impl Collate for SupervisedItem {
    type Batch = SupervisedBatch;

    fn collate(items: Vec<SupervisedItem>) -> Result<SupervisedBatch> {
        let labels: Vec<i64> = items.iter().map(|item| item.label).collect();
        let mut images = Vec::with_capacity(items.len());
        let mut paths = Vec::with_capacity(items.len());
        for item in items {
            images.push(item.image);
            paths.push(item.path);
        }
        Ok(SupervisedBatch {
            images: Tensor::f_stack(&images, 0)?,
            labels: Tensor::f_from_slice(&labels)?,
            paths,
        })
    }
}

impl Collate for SslItem {
    type Batch = SslBatch;

    fn collate(items: Vec<SslItem>) -> Result<SslBatch> {
        let labels: Vec<i64> = items.iter().map(|item| item.label).collect();
        let mut views = Vec::with_capacity(items.len());
        for mut item in items {
            let stacked = item.data.remove(SSL_DATA_KEY).ok_or_else(|| {
                DatasetError::InvalidConfig(format!("ssl item without {:?} entry", SSL_DATA_KEY))
            })?;
            views.push(stacked);
        }
        Ok(SslBatch {
            views: Tensor::f_stack(&views, 0)?,
            labels: Tensor::f_from_slice(&labels)?,
        })
    }
}

/// Walks a dataset in batches, loading the items of each batch in parallel on the rayon
/// thread pool.
pub struct BatchLoader<'a, D: Dataset> {
    dataset: &'a D,
    indices: Vec<usize>,
    batch_size: usize,
    drop_last: bool,
    next_element_index: usize,
}

impl<'a, D: Dataset> BatchLoader<'a, D> {
    pub fn new(
        dataset: &'a D,
        batch_size: usize,
        sampling: Sampling,
    ) -> Result<BatchLoader<'a, D>> {
        if batch_size == 0 {
            return Err(DatasetError::InvalidConfig("batch size must be positive".to_string()));
        }
        Ok(BatchLoader {
            dataset,
            indices: sample_indices(dataset.len(), sampling),
            batch_size,
            drop_last: false,
            next_element_index: 0,
        })
    }

    /// Skip the last batch when it would be smaller than `batch_size`
    pub fn drop_last(mut self, drop_last: bool) -> Self {
        self.drop_last = drop_last;
        self
    }

    /// Number of batches this loader yields in total
    pub fn num_batches(&self) -> usize {
        let len = self.indices.len();
        if self.drop_last || len % self.batch_size == 0 {
            len / self.batch_size
        } else {
            len / self.batch_size + 1
        }
    }

    fn next_indices(&mut self) -> Option<&[usize]> {
        let start = self.next_element_index;
        let end = start + self.batch_size.min(self.indices.len() - start);
        if start >= end || (self.drop_last && end - start < self.batch_size) {
            return None;
        }
        self.next_element_index = end;
        Some(&self.indices[start..end])
    }
}

impl<'a, D> Iterator for BatchLoader<'a, D>
where
    D: Dataset,
    D::Item: Collate,
{
    type Item = Result<<D::Item as Collate>::Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        let dataset = self.dataset;
        let batch_indices = self.next_indices()?;
        let start = Instant::now();
        let items: Result<Vec<D::Item>> =
            batch_indices.par_iter().map(|&i| dataset.get(i)).collect();
        let batch = items.and_then(<D::Item as Collate>::collate);
        debug!(
            "Loaded batch of {} items in {} ms",
            batch_indices.len(),
            start.elapsed().as_millis()
        );
        Some(batch)
    }
}

impl<'a, D> DataLoader for BatchLoader<'a, D>
where
    D: Dataset,
    D::Item: Collate,
{
    fn next_element_index(&self) -> usize {
        self.next_element_index
    }

    fn max_elem_index(&self) -> usize {
        self.indices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatasetArgs;
    use crate::dataset::data_loaders::{BloodDataset, SslBloodDataset};
    use crate::dataset::test_fixtures::image_tree;
    use std::collections::HashSet;

    const FILES: &[(&str, &str, u32, u32)] = &[
        ("a", "1.png", 40, 40),
        ("a", "2.png", 50, 30),
        ("b", "3.png", 90, 90),
        ("c", "4.png", 10, 60),
        ("c", "5.png", 84, 84),
    ];

    #[test]
    fn batch_test() {
        let root = image_tree("test", FILES);
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        let loader = BatchLoader::new(&dataset, 2, Sampling::Seeded(3)).unwrap();
        assert_eq!(loader.num_batches(), 3);
        assert_eq!(loader.max_elem_index(), 5);
        let mut seen = HashSet::new();
        let mut sizes = vec![];
        for batch in loader {
            let batch = batch.unwrap();
            let size = batch.paths.len() as i64;
            sizes.push(size);
            assert_eq!(batch.images.size(), vec![size, 3, 84, 84]);
            assert_eq!(batch.labels.size(), vec![size]);
            for (i, path) in batch.paths.iter().enumerate() {
                let class = path.parent().unwrap().file_name().unwrap().to_str().unwrap();
                let label = batch.labels.int64_value(&[i as i64]);
                assert_eq!(dataset.index().class_names()[label as usize], class);
                assert!(seen.insert(path.clone()));
            }
        }
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn drop_last_skips_partial_batch() {
        let root = image_tree("test", FILES);
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        let mut loader = BatchLoader::new(&dataset, 2, Sampling::Sequential)
            .unwrap()
            .drop_last(true);
        assert_eq!(loader.num_batches(), 2);
        assert!(loader.next().is_some());
        assert_eq!(loader.next_element_index(), 2);
        assert!(loader.next().is_some());
        assert!(loader.next().is_none());
    }

    #[test]
    fn ssl_batches_stack_views() {
        let root = image_tree("train", FILES);
        let args = DatasetArgs::new(root.path()).with_size(16);
        let dataset = SslBloodDataset::new("train", &args).unwrap();
        let batches: Vec<SslBatch> = BatchLoader::new(&dataset, 4, Sampling::Shuffled)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].views.size(), vec![4, 4, 3, 16, 16]);
        assert_eq!(batches[1].views.size(), vec![1, 4, 3, 16, 16]);
    }

    #[test]
    fn item_errors_are_returned() {
        let root = image_tree("test", FILES);
        std::fs::write(root.path().join("test").join("a").join("0.png"), b"not a png").unwrap();
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        let mut loader = BatchLoader::new(&dataset, 3, Sampling::Sequential).unwrap();
        assert!(matches!(loader.next(), Some(Err(DatasetError::ImageDecode { .. }))));
        assert!(loader.next().unwrap().is_ok());
    }

    #[test]
    fn huge_batch_size_takes_everything() {
        let root = image_tree("test", FILES);
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        let mut loader = BatchLoader::new(&dataset, usize::MAX, Sampling::Sequential).unwrap();
        assert_eq!(loader.num_batches(), 1);
        let batch = loader.next().unwrap().unwrap();
        assert_eq!(batch.images.size(), vec![5, 3, 84, 84]);
        assert!(loader.next().is_none());

        let mut loader = BatchLoader::new(&dataset, usize::MAX, Sampling::Sequential)
            .unwrap()
            .drop_last(true);
        assert_eq!(loader.num_batches(), 0);
        assert!(loader.next().is_none());
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let root = image_tree("test", FILES);
        let dataset = BloodDataset::new("test", &DatasetArgs::new(root.path()), None).unwrap();
        assert!(BatchLoader::new(&dataset, 0, Sampling::Sequential).is_err());
    }
}
