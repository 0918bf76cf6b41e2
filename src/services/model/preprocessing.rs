use linfa::{
    traits::{Fit, Transformer},
    DatasetBase,
};
use linfa_preprocessing::linear_scaling::LinearScaler;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Replaces missing (NaN) values with the training mean of their column
///
/// A column with no observed value at fit time imputes 0.0 so the vector
/// keeps its full width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeanImputer {
    means: Vec<f64>,
}

impl MeanImputer {
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> Self {
        let means = (0..n_features)
            .map(|j| {
                let (sum, count) = rows
                    .iter()
                    .map(|row| row[j])
                    .filter(|v| !v.is_nan())
                    .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
                if count == 0 {
                    0.0
                } else {
                    sum / count as f64
                }
            })
            .collect();

        Self { means }
    }

    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    pub fn transform(&self, row: &[f64]) -> AppResult<Vec<f64>> {
        AppError::check_dimensions(self.means.len(), row.len())?;
        Ok(row
            .iter()
            .zip(&self.means)
            .map(|(&v, &mean)| if v.is_nan() { mean } else { v })
            .collect())
    }
}

/// Standardises each column to zero mean and unit variance
///
/// Backed by linfa's standard [`LinearScaler`]: population standard deviation,
/// and constant columns are only centred.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StandardScaler {
    inner: LinearScaler<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>], n_features: usize) -> AppResult<Self> {
        let records = to_records(rows, n_features)?;
        let inner = LinearScaler::<f64>::standard()
            .fit(&DatasetBase::from(records))
            .map_err(|e| AppError::InvalidInput(format!("cannot fit scaler: {}", e)))?;

        Ok(Self { inner })
    }

    pub fn n_features(&self) -> usize {
        self.inner.offsets().len()
    }

    pub fn transform(&self, row: &[f64]) -> AppResult<Vec<f64>> {
        AppError::check_dimensions(self.n_features(), row.len())?;
        let records = to_records(&[row.to_vec()], row.len())?;
        Ok(self.inner.transform(records).into_raw_vec())
    }
}

impl PartialEq for StandardScaler {
    fn eq(&self, other: &Self) -> bool {
        self.inner.offsets() == other.inner.offsets() && self.inner.scales() == other.inner.scales()
    }
}

fn to_records(rows: &[Vec<f64>], n_features: usize) -> AppResult<Array2<f64>> {
    for row in rows {
        AppError::check_dimensions(n_features, row.len())?;
    }
    Array2::from_shape_vec((rows.len(), n_features), rows.concat())
        .map_err(|e| AppError::InvalidInput(format!("malformed feature matrix: {}", e)))
}
