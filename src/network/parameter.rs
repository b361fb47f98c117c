use std::collections::BTreeMap;
use std::path::Path;

use serde::{Serialize, Deserialize};

use crate::math::matrix::Matrix;
use crate::{Result, TrainError};

/// A trainable tensor together with its accumulated gradient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub value: Matrix,
    #[serde(skip)]
    pub grad: Matrix,
}

impl Parameter {
    pub fn new(value: Matrix) -> Parameter {
        let grad = Matrix::zeros(value.rows, value.cols);
        Parameter { value, grad }
    }

    pub fn zero_grad(&mut self) {
        self.grad = Matrix::zeros(self.value.rows, self.value.cols);
    }

    /// Adds `grad` into the accumulated gradient.
    pub fn accumulate(&mut self, grad: &Matrix) -> Result<()> {
        if self.grad.shape() != self.value.shape() {
            self.zero_grad();
        }
        self.grad = self.grad.zip_map(grad, |a, b| a + b)?;
        Ok(())
    }
}

/// Named parameter values, the unit that gets snapshotted to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDict(pub BTreeMap<String, Matrix>);

impl StateDict {
    pub fn new() -> StateDict {
        StateDict(BTreeMap::new())
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Matrix) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Matrix> {
        self.0.get(name)
    }

    /// Looks up `name` and checks it has the shape of `like`.
    pub fn take_like(&self, name: &str, like: &Matrix) -> Result<Matrix> {
        let value = self.0.get(name).ok_or_else(|| {
            TrainError::Shape(format!("state dict has no entry '{}'", name))
        })?;
        value.expect_shape(like.shape(), name)?;
        Ok(value.clone())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes the snapshot as pretty-printed JSON, replacing any existing
    /// file in place.
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<StateDict> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
