//! Accumulated estimation errors of one estimator against ground truth.
//!
//! The error of an estimate `X̂` is `δ = X ⊖ X̂`, the right perturbation that
//! the reported covariances describe.

use std::fmt;

use nalgebra::{Cholesky, Vector6};

use crate::{
    covariance::Covariance,
    lie::{LieGroup, SE3, weighted_distance},
};

#[derive(Debug, Clone)]
pub struct ErrorStats {
    name: String,
    weights: Vector6<f64>,
    /// Steps ignored before accumulating, to measure the steady state.
    warmup: usize,
    seen: usize,
    count: usize,
    sum_sq_translation: f64,
    sum_sq_rotation: f64,
    sum_error: f64,
    max_error: f64,
    sum_nees: f64,
    nees_count: usize,
}

/// Steady-state figures of an [`ErrorStats`].
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub name: String,
    pub samples: usize,
    pub rmse_translation: f64,
    pub rmse_rotation: f64,
    pub mean_error: f64,
    pub max_error: f64,
    /// Average normalized estimation error squared, when covariances were
    /// recorded. Close to 6 for a consistent filter.
    pub mean_nees: Option<f64>,
}

impl ErrorStats {
    pub fn new(name: impl Into<String>, warmup: usize) -> Self {
        Self::with_weights(name, warmup, Vector6::repeat(1.0))
    }

    /// Per component `weights` of the error norm.
    pub fn with_weights(name: impl Into<String>, warmup: usize, weights: Vector6<f64>) -> Self {
        Self {
            name: name.into(),
            weights,
            warmup,
            seen: 0,
            count: 0,
            sum_sq_translation: 0.0,
            sum_sq_rotation: 0.0,
            sum_error: 0.0,
            max_error: 0.0,
            sum_nees: 0.0,
            nees_count: 0,
        }
    }

    /// Records one step and returns its weighted error norm.
    pub fn record(
        &mut self,
        truth: &SE3<f64>,
        estimate: &SE3<f64>,
        cov: Option<&Covariance<f64, 6>>,
    ) -> f64 {
        let error = weighted_distance(truth, estimate, &self.weights);
        self.seen += 1;
        if self.seen <= self.warmup {
            return error;
        }

        let delta = truth.minus(estimate);
        self.count += 1;
        self.sum_sq_translation += delta.fixed_rows::<3>(0).norm_squared();
        self.sum_sq_rotation += delta.fixed_rows::<3>(3).norm_squared();
        self.sum_error += error;
        self.max_error = self.max_error.max(error);

        if let Some(cholesky) = cov.and_then(|cov| Cholesky::new(cov.0)) {
            self.sum_nees += delta.dot(&cholesky.solve(&delta));
            self.nees_count += 1;
        }
        error
    }

    pub fn summary(&self) -> Summary {
        let samples = self.count.max(1) as f64;
        Summary {
            name: self.name.clone(),
            samples: self.count,
            rmse_translation: (self.sum_sq_translation / samples).sqrt(),
            rmse_rotation: (self.sum_sq_rotation / samples).sqrt(),
            mean_error: self.sum_error / samples,
            max_error: self.max_error,
            mean_nees: (self.nees_count > 0).then(|| self.sum_nees / self.nees_count as f64),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<5} rmse t {:.6} m, rmse r {:.6} rad, mean |d| {:.6}, max |d| {:.6}",
            self.name, self.rmse_translation, self.rmse_rotation, self.mean_error, self.max_error
        )?;
        if let Some(nees) = self.mean_nees {
            write!(f, ", nees {nees:.3}")?;
        }
        Ok(())
    }
}
