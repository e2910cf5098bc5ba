use std::{env, process};

use anyhow::Context;
use log::info;

use mlp::{Trainer, TrainingConfig};

/// Two bits in, one-hot parity out: `[0, 1]` when they are equal, `[1, 0]` otherwise.
const DEMO_CONFIG: &str = r#"{
    "network": { "input_width": 2, "layer_widths": [2, 2, 2] },
    "learning_rate": 0.5,
    "epochs": 100,
    "batch_size": 1,
    "report_every": 10,
    "training_set": [
        { "input": [0, 0], "output": [0, 1] },
        { "input": [0, 1], "output": [1, 0] },
        { "input": [1, 0], "output": [1, 0] },
        { "input": [1, 1], "output": [0, 1] }
    ]
}"#;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 3 {
        eprintln!("Usage: {} [config.json] [stats.json]", args[0]);
        process::exit(1);
    }

    let config = match args.get(1) {
        Some(path) => TrainingConfig::from_path(path)
            .with_context(|| format!("failed to load config from {path}"))?,
        None => {
            info!("no config given, training the built-in demo");
            TrainingConfig::from_json(DEMO_CONFIG)?
        }
    };

    let mut trainer = Trainer::new(&config)?;
    info!("initial cost = {}", trainer.cost()?);

    trainer.train()?;
    info!("final cost = {}", trainer.cost()?);
    info!("params = {:?}", trainer.network().flatten());

    if let Some(path) = args.get(2) {
        trainer
            .tracker()
            .dump_to_path(path)
            .with_context(|| format!("failed to dump stats to {path}"))?;
        info!("stats written to {path}");
    }

    Ok(())
}
