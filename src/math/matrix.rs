use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

use crate::{Result, TrainError};

/// Dense row-major matrix. Row `i` is sample `i` wherever a matrix carries a
/// batch, so `rows` is the leading (sample-count) dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix{
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>
}

impl Matrix{
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix{
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows]
        }
    }

    /// Wraps already rectangular data. Use `from_rows` for untrusted input.
    pub fn from_data(data: Vec<Vec<f64>>) -> Matrix {
        Matrix {
            rows: data.len(),
            cols: data.first().map_or(0, |row| row.len()),
            data
        }
    }

    /// Like `from_data`, but rejects ragged rows.
    pub fn from_rows(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, |row| row.len());
        if let Some((i, row)) = data.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(TrainError::Shape(format!(
                "row {} has {} columns, expected {}", i, row.len(), cols
            )));
        }
        Ok(Matrix { rows: data.len(), cols, data })
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Draw two independent uniform samples in (0, 1] to avoid log(0).
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal_with<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let mut res = Matrix::zeros(rows, cols);
        for i in 0..rows {
            for j in 0..cols {
                res.data[i][j] = Matrix::sample_standard_normal(rng) * std_dev;
            }
        }
        res
    }

    /// He initialization: samples from N(0, sqrt(2 / rows)).
    ///
    /// Weights are stored as (fan_in, fan_out), so `rows` is the fan-in.
    /// Recommended before ReLU layers.
    pub fn he_with<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal_with(rows, cols, (2.0 / rows.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: samples from N(0, sqrt(1 / rows)).
    ///
    /// Recommended before Sigmoid/Tanh/Identity layers.
    pub fn xavier_with<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal_with(rows, cols, (1.0 / rows.max(1) as f64).sqrt(), rng)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn transpose(&self) -> Matrix {
        let mut res = Matrix::zeros(self.cols, self.rows);

        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }

        res
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self.data.iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Element-wise combination of two same-shape matrices.
    pub fn zip_map<F>(&self, rhs: &Matrix, functor: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        self.expect_shape(rhs.shape(), "element-wise op")?;
        let data = self.data.iter().zip(rhs.data.iter())
            .map(|(row_a, row_b)| {
                row_a.iter().zip(row_b.iter()).map(|(&x, &y)| functor(x, y)).collect()
            })
            .collect();
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }

    /// Element-wise (Hadamard) product.
    pub fn hadamard(&self, rhs: &Matrix) -> Result<Matrix> {
        self.zip_map(rhs, |x, y| x * y)
    }

    pub fn matmul(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(TrainError::Shape(format!(
                "cannot multiply {}x{} by {}x{}", self.rows, self.cols, rhs.rows, rhs.cols
            )));
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..self.rows {
            for k in 0..self.cols {
                let a = self.data[i][k];
                for j in 0..rhs.cols {
                    res.data[i][j] += a * rhs.data[k][j];
                }
            }
        }
        Ok(res)
    }

    /// Adds a 1xN row (a bias) to every row.
    pub fn add_row(&self, row: &Matrix) -> Result<Matrix> {
        if row.rows != 1 || row.cols != self.cols {
            return Err(TrainError::Shape(format!(
                "cannot broadcast {}x{} over {}x{}", row.rows, row.cols, self.rows, self.cols
            )));
        }
        let bias = &row.data[0];
        let data = self.data.iter()
            .map(|r| r.iter().zip(bias.iter()).map(|(x, b)| x + b).collect())
            .collect();
        Ok(Matrix { rows: self.rows, cols: self.cols, data })
    }

    /// Column sums as a 1xN row.
    pub fn sum_rows(&self) -> Matrix {
        let mut sums = vec![0.0; self.cols];
        for row in &self.data {
            for (s, x) in sums.iter_mut().zip(row.iter()) {
                *s += x;
            }
        }
        Matrix { rows: 1, cols: self.cols, data: vec![sums] }
    }

    /// Joins matrices side by side. All parts must share the row count.
    pub fn concat_cols(parts: &[&Matrix]) -> Result<Matrix> {
        let rows = parts.first().map_or(0, |m| m.rows);
        if let Some(bad) = parts.iter().find(|m| m.rows != rows) {
            return Err(TrainError::Shape(format!(
                "cannot join a {}-row matrix with {}-row matrices", bad.rows, rows
            )));
        }
        let cols = parts.iter().map(|m| m.cols).sum();
        let data = (0..rows)
            .map(|i| {
                let mut row = Vec::with_capacity(cols);
                for part in parts {
                    row.extend_from_slice(&part.data[i]);
                }
                row
            })
            .collect();
        Ok(Matrix { rows, cols, data })
    }

    /// Inverse of `concat_cols`: splits into consecutive column blocks.
    pub fn split_cols(&self, widths: &[usize]) -> Result<Vec<Matrix>> {
        if widths.iter().sum::<usize>() != self.cols {
            return Err(TrainError::Shape(format!(
                "column widths {:?} do not cover {} columns", widths, self.cols
            )));
        }
        let mut start = 0;
        let mut parts = Vec::with_capacity(widths.len());
        for &w in widths {
            let data = self.data.iter().map(|row| row[start..start + w].to_vec()).collect();
            parts.push(Matrix { rows: self.rows, cols: w, data });
            start += w;
        }
        Ok(parts)
    }

    /// Stacks matrices vertically, preserving their order. Storage for all
    /// rows is reserved once before copying.
    pub fn vstack(parts: &[Matrix]) -> Result<Matrix> {
        let cols = parts.iter().find(|m| m.rows > 0).map_or(0, |m| m.cols);
        let rows: usize = parts.iter().map(|m| m.rows).sum();
        let mut data = Vec::with_capacity(rows);
        for part in parts {
            if part.rows > 0 && part.cols != cols {
                return Err(TrainError::Shape(format!(
                    "cannot stack a {}-column matrix onto {}-column matrices", part.cols, cols
                )));
            }
            data.extend(part.data.iter().cloned());
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Per-row index of the maximum value (the class dimension).
    /// Ties go to the lowest index; NaN never wins.
    pub fn argmax_rows(&self) -> Vec<usize> {
        self.data.iter()
            .map(|row| {
                let mut best = 0;
                for (j, &x) in row.iter().enumerate() {
                    if x > row[best] || (row[best].is_nan() && !x.is_nan()) {
                        best = j;
                    }
                }
                best
            })
            .collect()
    }

    pub fn expect_shape(&self, shape: (usize, usize), what: &str) -> Result<()> {
        if self.shape() != shape {
            return Err(TrainError::Shape(format!(
                "{}: expected {}x{}, got {}x{}", what, shape.0, shape.1, self.rows, self.cols
            )));
        }
        Ok(())
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
