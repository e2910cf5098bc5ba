use ndarray::{Array1, ArrayView1};

/// The error measure minimized by training. Callers guarantee `y_pred` and `y` share a length.
pub trait LossFn {
    fn loss(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> f32;

    /// The derivative of the loss with respect to each predicted output.
    fn loss_prime(&self, y_pred: ArrayView1<f32>, y: ArrayView1<f32>) -> Array1<f32>;
}
