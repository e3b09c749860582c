use rand::{thread_rng, Rng};

use crate::error::Result;

pub mod common_structs;

pub mod data_augmenters;
pub mod data_loaders;
pub mod data_transformers;
pub mod iterator_adapters;

#[cfg(test)]
pub(crate) mod test_fixtures;

/// Random access to preprocessed items.
///
/// Implementations keep no mutable state, so `get` can be called from several worker
/// threads at once.
pub trait Dataset: Send + Sync {
    type Item: Send;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Loads and transforms the item at `index`, drawing the random augmentations from `rng`
    fn get_with_rng<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Result<Self::Item>;

    fn get(&self, index: usize) -> Result<Self::Item> {
        self.get_with_rng(index, &mut thread_rng())
    }
}

/// Extends the iterator trait to make sure the Dataset has methods display progress
pub trait DataLoader: Iterator {
    /// Returns the next element index, starting from 0
    fn next_element_index(&self) -> usize;
    /// Returns the index of the last element to be loaded
    fn max_elem_index(&self) -> usize;
}
