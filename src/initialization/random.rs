use std::iter;

use rand::Rng;
use rand_distr::{Distribution, Uniform};

use super::ParamGen;
use crate::{MlErr, Result};

/// Draws values from `distribution`, up to `budget` values in total.
#[derive(Debug, Clone)]
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: R,
    distribution: D,
    budget: usize,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    pub fn new(rng: R, distribution: D, budget: usize) -> Self {
        Self {
            rng,
            distribution,
            budget,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Draws uniformly from `[low, high)`.
    ///
    /// # Errors
    /// `InvalidConfig` if the range is empty or not finite.
    pub fn uniform(rng: R, budget: usize, low: f32, high: f32) -> Result<Self> {
        let distribution = Uniform::new(low, high)
            .map_err(|e| MlErr::InvalidConfig(format!("uniform [{low}, {high}): {e}")))?;

        Ok(Self::new(rng, distribution, budget))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        if self.budget == 0 {
            return None;
        }

        let take = n.min(self.budget);
        self.budget -= take;

        let Self {
            rng, distribution, ..
        } = self;
        Some(
            iter::repeat_with(|| distribution.sample(&mut *rng))
                .take(take)
                .collect(),
        )
    }
}
