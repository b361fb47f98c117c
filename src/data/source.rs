use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::data::batch::{Batch, PRIMARY_TASK};
use crate::math::matrix::Matrix;
use crate::{Result, TrainError};

/// Dataset partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Valid,
    Test,
}

impl Split {
    pub fn name(&self) -> &'static str {
        match self {
            Split::Train => "train",
            Split::Valid => "valid",
            Split::Test => "test",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub type BatchIter<'a> = Box<dyn Iterator<Item = Result<Batch>> + 'a>;

/// Supplier of batches for each split.
///
/// Every call to `batches` starts the split over from the beginning; the
/// order must be the same across calls only if the caller needs it to be.
pub trait DataSource {
    fn batches(&self, split: Split) -> Result<BatchIter<'_>>;
}

/// One labelled sample before batching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub id: String,
    pub text: Vec<f64>,
    pub audio: Vec<f64>,
    pub vision: Vec<f64>,
    pub label: f64,
}

/// All three splits as plain sample lists, the on-disk JSON layout read by
/// the `ferrite-mmsa` binary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleSet {
    pub train: Vec<Sample>,
    pub valid: Vec<Sample>,
    pub test: Vec<Sample>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_batch_size() -> usize {
    32
}

impl SampleSet {
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<SampleSet> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn into_source(self) -> Result<InMemoryDataSource> {
        InMemoryDataSource::from_samples(&self.train, &self.valid, &self.test, self.batch_size)
    }
}

/// Batches held in memory, replayed in the same order on every pass.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataSource {
    pub train: Vec<Batch>,
    pub valid: Vec<Batch>,
    pub test: Vec<Batch>,
}

impl InMemoryDataSource {
    pub fn new(train: Vec<Batch>, valid: Vec<Batch>, test: Vec<Batch>) -> Self {
        InMemoryDataSource { train, valid, test }
    }

    /// Chunks each sample list into batches of `batch_size` (the last one may
    /// be shorter), keeping sample order.
    pub fn from_samples(
        train: &[Sample],
        valid: &[Sample],
        test: &[Sample],
        batch_size: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(TrainError::Config("batch_size must be at least 1".to_string()));
        }
        let chunk = |samples: &[Sample]| -> Result<Vec<Batch>> {
            samples.chunks(batch_size).map(collate).collect()
        };
        Ok(InMemoryDataSource {
            train: chunk(train)?,
            valid: chunk(valid)?,
            test: chunk(test)?,
        })
    }

    pub fn split(&self, split: Split) -> &[Batch] {
        match split {
            Split::Train => &self.train,
            Split::Valid => &self.valid,
            Split::Test => &self.test,
        }
    }

    pub fn num_samples(&self, split: Split) -> usize {
        self.split(split).iter().map(Batch::len).sum()
    }
}

impl DataSource for InMemoryDataSource {
    fn batches(&self, split: Split) -> Result<BatchIter<'_>> {
        Ok(Box::new(self.split(split).iter().cloned().map(Ok)))
    }
}

/// Stacks samples into a single batch.
pub fn collate(samples: &[Sample]) -> Result<Batch> {
    let text = Matrix::from_rows(samples.iter().map(|s| s.text.clone()).collect())?;
    let audio = Matrix::from_rows(samples.iter().map(|s| s.audio.clone()).collect())?;
    let vision = Matrix::from_rows(samples.iter().map(|s| s.vision.clone()).collect())?;
    let labels = samples.iter().map(|s| s.label).collect();

    let batch = Batch {
        vision,
        audio,
        text,
        ids: samples.iter().map(|s| s.id.clone()).collect(),
        labels: BTreeMap::from([(PRIMARY_TASK.to_string(), labels)]),
    };
    batch.validate()?;
    Ok(batch)
}
