use serde::{Deserialize, Serialize};

/// A labeled sample: an input and the output the network should produce for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub input: Vec<f32>,
    pub output: Vec<f32>,
}

impl Example {
    pub fn new(input: Vec<f32>, output: Vec<f32>) -> Self {
        Self { input, output }
    }
}
