use std::{fs, num::NonZeroUsize, path::Path};

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::Example;
use crate::{
    MlErr, Result,
    arch::Network,
    initialization::{ConstParamGen, RandParamGen},
};

/// How the initial parameters of a network are generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamGenConfig {
    Uniform { low: f32, high: f32 },
    Const { value: f32 },
}

impl Default for ParamGenConfig {
    fn default() -> Self {
        Self::Uniform { low: -1., high: 1. }
    }
}

/// The topology of a network and how to initialize it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub input_width: usize,
    pub layer_widths: Vec<usize>,
    #[serde(default)]
    pub init: ParamGenConfig,
}

impl NetworkConfig {
    /// Builds the configured network.
    ///
    /// # Arguments
    /// * `seed` - The seed for random initializations, the os rng is used if missing.
    pub fn build(&self, seed: Option<u64>) -> Result<Network> {
        let &Self {
            input_width,
            ref layer_widths,
            init,
        } = self;

        match init {
            ParamGenConfig::Uniform { low, high } => {
                let rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(seed),
                    None => StdRng::from_os_rng(),
                };
                let mut param_gen = RandParamGen::uniform(rng, usize::MAX, low, high)?;
                Network::with_param_gen(input_width, layer_widths, &mut param_gen)
            }
            ParamGenConfig::Const { value } => {
                let mut param_gen = ConstParamGen::new(value, usize::MAX);
                Network::with_param_gen(input_width, layer_widths, &mut param_gen)
            }
        }
    }
}

fn default_report_every() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_shuffle() -> bool {
    true
}

/// Everything a training run needs, usually read from a json file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub network: NetworkConfig,
    pub learning_rate: f32,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    #[serde(default)]
    pub parallel: bool,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_report_every")]
    pub report_every: NonZeroUsize,
    pub training_set: Vec<Example>,
}

impl TrainingConfig {
    /// Parses and validates a json config.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a json config file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Checks the config is consistent before anything is built from it.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(MlErr::InvalidConfig(msg));

        if !self.learning_rate.is_finite() || self.learning_rate <= 0. {
            return invalid(format!(
                "learning_rate must be positive and finite, got {}",
                self.learning_rate
            ));
        }

        let &NetworkConfig {
            input_width,
            ref layer_widths,
            init,
        } = &self.network;

        if input_width == 0 {
            return invalid("input_width must be greater than 0".into());
        }

        let Some(&output_width) = layer_widths.last() else {
            return invalid("the network must have at least one layer".into());
        };

        if let Some(i) = layer_widths.iter().position(|&w| w == 0) {
            return invalid(format!("layer {i}: width must be greater than 0"));
        }

        if let ParamGenConfig::Uniform { low, high } = init {
            if !(low < high) {
                return invalid(format!("init range [{low}, {high}) is empty"));
            }
        }

        if self.training_set.is_empty() {
            return invalid("training_set must have at least one example".into());
        }

        for (i, example) in self.training_set.iter().enumerate() {
            if example.input.len() != input_width {
                return invalid(format!(
                    "example {i}: input width ({}) does not match input_width ({input_width})",
                    example.input.len()
                ));
            }

            if example.output.len() != output_width {
                return invalid(format!(
                    "example {i}: output width ({}) does not match the last layer width \
                     ({output_width})",
                    example.output.len()
                ));
            }
        }

        if self.batch_size.get() > self.training_set.len() {
            return invalid(format!(
                "batch_size ({}) exceeds training set size ({} examples)",
                self.batch_size,
                self.training_set.len()
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const XOR: &str = r#"{
        "network": { "input_width": 2, "layer_widths": [3, 1] },
        "learning_rate": 0.5,
        "epochs": 10,
        "batch_size": 2,
        "seed": 42,
        "training_set": [
            { "input": [0, 0], "output": [0] },
            { "input": [0, 1], "output": [1] },
            { "input": [1, 0], "output": [1] },
            { "input": [1, 1], "output": [0] }
        ]
    }"#;

    fn xor_with(patch: impl FnOnce(&mut serde_json::Value)) -> String {
        let mut value: serde_json::Value = serde_json::from_str(XOR).unwrap();
        patch(&mut value);
        value.to_string()
    }

    #[test]
    fn parses_with_defaults() {
        let config = TrainingConfig::from_json(XOR).unwrap();

        assert_eq!(config.network.init, ParamGenConfig::Uniform { low: -1., high: 1. });
        assert_eq!(config.report_every.get(), 1);
        assert!(config.shuffle);
        assert!(!config.parallel);
        assert_eq!(config.training_set[3], Example::new(vec![1., 1.], vec![0.]));
    }

    #[test]
    fn builds_the_same_network_for_the_same_seed() {
        let config = TrainingConfig::from_json(XOR).unwrap();

        let a = config.network.build(config.seed).unwrap();
        let b = config.network.build(config.seed).unwrap();

        assert_eq!(a.layer_widths(), vec![3, 1]);
        assert_eq!(a.flatten(), b.flatten());
    }

    #[test]
    fn const_init() {
        let json = xor_with(|v| v["network"]["init"] = serde_json::json!({ "const": { "value": 0.5 } }));
        let config = TrainingConfig::from_json(&json).unwrap();
        let network = config.network.build(None).unwrap();

        assert!(network.flatten().iter().all(|&p| p == 0.5));
    }

    #[test]
    fn rejects_invalid_configs() {
        let patches: [fn(&mut serde_json::Value); 10] = [
            |v| v["learning_rate"] = 0.into(),
            |v| v["learning_rate"] = (-1.0).into(),
            |v| v["network"]["input_width"] = 0.into(),
            |v| v["network"]["layer_widths"] = serde_json::json!([]),
            |v| v["network"]["layer_widths"] = serde_json::json!([3, 0, 1]),
            |v| v["network"]["layer_widths"] = serde_json::json!([3, 2]),
            |v| v["training_set"] = serde_json::json!([]),
            |v| v["training_set"][1]["input"] = serde_json::json!([0, 1, 1]),
            |v| v["batch_size"] = 5.into(),
            |v| v["network"]["init"] = serde_json::json!({ "uniform": { "low": 1, "high": 1 } }),
        ];

        for (i, patch) in patches.into_iter().enumerate() {
            let json = xor_with(patch);
            assert!(
                matches!(TrainingConfig::from_json(&json), Err(MlErr::InvalidConfig(_))),
                "patch {i} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_zero_epochs_while_parsing() {
        let json = xor_with(|v| v["epochs"] = 0.into());
        assert!(matches!(TrainingConfig::from_json(&json), Err(MlErr::Json(_))));
    }
}
