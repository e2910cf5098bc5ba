use std::{env, fs, process};

use mlp::{
    Example, Network, Trainer, TrainingConfig,
    metrics::{calc_accuracy, evaluate_cost},
    training::{par_train_batch, train_batch},
};

fn and_set() -> Vec<Example> {
    vec![
        Example::new(vec![0., 0.], vec![0.]),
        Example::new(vec![0., 1.], vec![0.]),
        Example::new(vec![1., 0.], vec![0.]),
        Example::new(vec![1., 1.], vec![1.]),
    ]
}

fn config(layer_widths: &str, epochs: usize, batch_size: usize, set: &str) -> TrainingConfig {
    let json = format!(
        r#"{{
            "network": {{ "input_width": 2, "layer_widths": {layer_widths} }},
            "learning_rate": 0.5,
            "epochs": {epochs},
            "batch_size": {batch_size},
            "seed": 1234,
            "training_set": {set}
        }}"#
    );

    TrainingConfig::from_json(&json).unwrap()
}

const ONE_HOT_AND: &str = r#"[
    { "input": [0, 0], "output": [0, 1] },
    { "input": [0, 1], "output": [0, 1] },
    { "input": [1, 0], "output": [0, 1] },
    { "input": [1, 1], "output": [1, 0] }
]"#;

#[test]
fn full_batch_loss_never_increases() {
    let batch = and_set();
    let mut network = Network::seeded(2, &[3, 1], 42).unwrap();

    let mut previous = f32::INFINITY;
    for step in 0..300 {
        let loss = train_batch(&mut network, &batch, 0.1).unwrap();
        assert!(loss <= previous + 1e-6, "step {step}: {loss} > {previous}");
        previous = loss;
    }
}

#[test]
fn parallel_full_batch_loss_never_increases() {
    let batch = and_set();
    let mut network = Network::seeded(2, &[3, 1], 43).unwrap();

    let mut previous = f32::INFINITY;
    for step in 0..100 {
        let loss = par_train_batch(&mut network, &batch, 0.1).unwrap();
        assert!(loss <= previous + 1e-6, "step {step}: {loss} > {previous}");
        previous = loss;
    }
}

#[test]
fn online_training_learns_a_separable_set() {
    let config = config("[2]", 2000, 1, ONE_HOT_AND);
    let mut trainer = Trainer::new(&config).unwrap();

    let initial = trainer.cost().unwrap();
    let history = trainer.train().unwrap();
    let last = history.last().unwrap();

    assert!(last.cost < initial, "{} >= {initial}", last.cost);
    assert!(last.cost < 0.35, "{}", last.cost);

    let mut network = trainer.into_network();
    assert_eq!(calc_accuracy(&mut network, &config.training_set).unwrap(), 1.);
    let cost = evaluate_cost(&mut network, &config.training_set).unwrap();
    assert!((cost - last.cost).abs() < 1e-6);
}

#[test]
fn mini_batches_train_a_deeper_network() {
    let config = config("[2, 2, 2]", 50, 2, ONE_HOT_AND);
    let mut trainer = Trainer::new(&config).unwrap();

    let history = trainer.train().unwrap();

    assert_eq!(history.len(), 50);
    assert!(history.iter().all(|s| s.cost.is_finite() && s.loss.is_finite()));
    assert_eq!(trainer.network().layer_widths(), vec![2, 2, 2]);
}

#[test]
fn stats_dump_to_file() {
    let config = config("[3, 2]", 7, 4, ONE_HOT_AND);
    let mut trainer = Trainer::new(&config).unwrap();
    trainer.train().unwrap();

    let path = env::temp_dir().join(format!("mlp-stats-{}.json", process::id()));
    trainer.tracker().dump_to_path(&path).unwrap();

    let contents = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&contents).unwrap();
    let data = json["data"].as_array().unwrap();

    assert_eq!(data.len(), 7);
    assert_eq!(data[6]["data"]["epoch"], 7);
    assert!(json["start_time"].as_u64().unwrap() <= json["end_time"].as_u64().unwrap());
}

#[test]
fn invalid_config_is_rejected_by_the_trainer() {
    let mut config = config("[2]", 1, 1, ONE_HOT_AND);
    config.training_set[0].output.push(1.);

    assert!(Trainer::new(&config).is_err());
}
