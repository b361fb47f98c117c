pub mod batch;
pub mod source;

pub use batch::{Batch, PRIMARY_TASK};
pub use source::{collate, BatchIter, DataSource, InMemoryDataSource, Sample, SampleSet, Split};
