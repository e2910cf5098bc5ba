use crate::Result;

/// Anything that maps an input vector to an output vector, such as a `Network`.
pub trait Feedforward {
    fn forward(&mut self, x: &[f32]) -> Result<Vec<f32>>;
}
