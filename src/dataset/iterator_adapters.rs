pub mod batching;
pub mod shuffling;

pub use batching::{BatchLoader, Collate, SslBatch, SupervisedBatch};
pub use shuffling::{sample_indices, Sampling};
