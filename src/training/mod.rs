mod backprop;
mod batch;
mod config;
mod example;
mod trainer;

pub use backprop::{backpropagate, backpropagate_with, gradient};
pub use batch::{par_train_batch, par_train_batch_with, train_batch, train_batch_with};
pub use config::{NetworkConfig, ParamGenConfig, TrainingConfig};
pub use example::Example;
pub use trainer::Trainer;
