pub mod arch;
pub mod error;
pub mod initialization;
pub mod metrics;
pub mod stats;
pub mod training;

pub use arch::{Feedforward, Layer, Network, Neuron};
pub use error::{MlErr, Result};
pub use training::{Example, Trainer, TrainingConfig};
