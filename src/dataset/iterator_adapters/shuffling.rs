use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};

/// Order in which a [`BatchLoader`](super::batching::BatchLoader) visits the dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Sampling {
    #[default]
    Sequential,
    Shuffled,
    /// Shuffled, always the same way for a given seed
    Seeded(u64),
}

/// The indices `0..len` arranged according to `sampling`
pub fn sample_indices(len: usize, sampling: Sampling) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..len).collect();
    match sampling {
        Sampling::Sequential => {}
        Sampling::Shuffled => indices.shuffle(&mut thread_rng()),
        Sampling::Seeded(seed) => indices.shuffle(&mut StdRng::seed_from_u64(seed)),
    }
    indices
}
