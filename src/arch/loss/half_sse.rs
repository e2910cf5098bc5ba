use ndarray::{Array1, ArrayView1};

use super::LossFn;

/// Half squared error loss `½ Σ (y_pred - y)²`, whose derivative is plainly `y_pred - y`.
#[derive(Default, Clone, Copy, Debug)]
pub struct HalfSquaredError;

impl HalfSquaredError {
    /// Returns a new `HalfSquaredError`.
    pub fn new() -> Self {
        Self
    }
}

impl LossFn for HalfSquaredError {
    fn loss(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> f32 {
        0.5 * (&y_pred - &y).mapv(|x| x.powi(2)).sum()
    }

    fn loss_prime(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> Array1<f32> {
        &y_pred - &y
    }
}
