use std::time::Instant;

use log::{info, warn};
use rand::{SeedableRng, rngs::StdRng, seq::SliceRandom};

use super::{
    Example, TrainingConfig, backpropagate_with, par_train_batch_with, train_batch_with,
};
use crate::{
    MlErr, Result,
    arch::{
        Network,
        loss::{HalfSquaredError, LossFn},
    },
    metrics::evaluate_cost,
    stats::{EpochStats, StatTracker},
};

/// Runs the epochs of a training session over a fixed training set.
pub struct Trainer<L: LossFn + Sync = HalfSquaredError> {
    network: Network,
    training_set: Vec<Example>,
    loss: L,
    rng: StdRng,
    tracker: StatTracker<EpochStats>,

    learning_rate: f32,
    epochs: usize,
    batch_size: usize,
    parallel: bool,
    shuffle: bool,
    report_every: usize,
    epochs_done: usize,
}

impl Trainer {
    /// Validates `config` and builds the trainer and its network, minimizing the half squared
    /// error.
    pub fn new(config: &TrainingConfig) -> Result<Self> {
        Self::with_loss(config, HalfSquaredError)
    }
}

impl<L: LossFn + Sync> Trainer<L> {
    /// Same as `new` but minimizing `loss`.
    pub fn with_loss(config: &TrainingConfig, loss: L) -> Result<Self> {
        config.validate()?;

        let network = config.network.build(config.seed)?;
        Ok(Self {
            network,
            training_set: config.training_set.clone(),
            loss,
            rng: generate_rng(config.seed),
            tracker: StatTracker::new(),
            learning_rate: config.learning_rate,
            epochs: config.epochs.get(),
            batch_size: config.batch_size.get(),
            parallel: config.parallel,
            shuffle: config.shuffle,
            report_every: config.report_every.get(),
            epochs_done: 0,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    /// Every epoch recorded so far, timed.
    pub fn tracker(&self) -> &StatTracker<EpochStats> {
        &self.tracker
    }

    /// The cost of the network over the training set as it is now.
    pub fn cost(&mut self) -> Result<f32> {
        evaluate_cost(&mut self.network, &self.training_set)
    }

    /// Runs the configured amount of epochs.
    ///
    /// Every epoch the training set is shuffled (if configured) and split in batches, each
    /// batch makes a single gradient descent step. Calling it again keeps training the same
    /// network, epochs are numbered across calls.
    ///
    /// # Returns
    /// The stats of the epochs run by this call or the first error, which aborts the step it
    /// happened in.
    pub fn train(&mut self) -> Result<Vec<EpochStats>> {
        let start = Instant::now();
        let mut history = Vec::with_capacity(self.epochs);

        for _ in 0..self.epochs {
            self.epochs_done += 1;
            let epoch = self.epochs_done;

            let loss = self.run_epoch()?;
            let cost = self.cost()?;

            if !cost.is_finite() {
                warn!(epoch = epoch; "cost is {cost}, the learning rate may be too large");
            }

            if epoch % self.report_every == 0 || history.len() + 1 == self.epochs {
                info!(epoch = epoch; "cost = {cost}, loss = {loss}");
            }

            let stats = EpochStats {
                epoch,
                cost,
                loss,
                elapsed_secs: start.elapsed().as_secs_f64(),
            };
            self.tracker.log(stats);
            history.push(stats);
        }

        Ok(history)
    }

    /// Makes one pass over the training set, returns the mean loss of its batches.
    fn run_epoch(&mut self) -> Result<f32> {
        if self.shuffle {
            self.training_set.shuffle(&mut self.rng);
        }

        let mut total = 0.;
        let mut nbatches = 0;

        for batch in self.training_set.chunks(self.batch_size) {
            let network = &mut self.network;
            let (lr, loss) = (self.learning_rate, &self.loss);

            total += match batch {
                [example] => backpropagate_with(network, example, lr, loss)?,
                _ if self.parallel => par_train_batch_with(network, batch, lr, loss)?,
                _ => train_batch_with(network, batch, lr, loss)?,
            };
            nbatches += 1;
        }

        if nbatches == 0 {
            return Err(MlErr::EmptyDataset);
        }

        Ok(total / nbatches as f32)
    }
}

fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
