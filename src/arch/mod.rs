pub mod activations;
mod feedforward;
mod layer;
pub mod loss;
mod network;
mod neuron;

pub use feedforward::Feedforward;
pub use layer::Layer;
pub use network::{Direction, Network, adjacent_layer};
pub use neuron::{Neuron, NeuronParams};
