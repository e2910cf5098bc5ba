//! Sources for the initial parameters of a network.

mod constant;
mod random;

pub use constant::ConstParamGen;
pub use random::RandParamGen;

use crate::{MlErr, Result};

/// Hands out initial parameter values, possibly running out after a budget.
pub trait ParamGen {
    /// Takes up to `n` values, `None` once nothing is left.
    fn sample(&mut self, n: usize) -> Option<Vec<f32>>;

    /// Takes exactly `n` values.
    ///
    /// # Errors
    /// `ParamGenExhausted` if fewer than `n` values were left, those are lost.
    fn sample_exact(&mut self, n: usize) -> Result<Vec<f32>> {
        let values = self.sample(n).unwrap_or_default();
        if values.len() != n {
            return Err(MlErr::ParamGenExhausted {
                got: values.len(),
                expected: n,
            });
        }

        Ok(values)
    }
}
