use rayon::prelude::*;

use super::{
    Example,
    backprop::{accumulate_gradient, descend},
};
use crate::{
    MlErr, Result,
    arch::{
        Network,
        loss::{HalfSquaredError, LossFn},
    },
};

/// Trains `network` on a batch with the half squared error loss.
///
/// See `train_batch_with`.
pub fn train_batch(network: &mut Network, batch: &[Example], learning_rate: f32) -> Result<f32> {
    train_batch_with(network, batch, learning_rate, &HalfSquaredError)
}

/// Makes one gradient descent step over a whole batch.
///
/// The gradient of each example is computed as in `backpropagate_with`, the step is taken
/// along their mean and committed once. Any error aborts the step leaving the network as it
/// was.
///
/// # Returns
/// The mean loss over the batch, before the update.
pub fn train_batch_with<L>(
    network: &mut Network,
    batch: &[Example],
    learning_rate: f32,
    loss: &L,
) -> Result<f32>
where
    L: LossFn + ?Sized,
{
    if batch.is_empty() {
        return Err(MlErr::EmptyDataset);
    }

    let mut grad = vec![0.; network.num_params()];
    let mut total_loss = 0.;
    for example in batch {
        total_loss += accumulate_gradient(network, example, loss, &mut grad)?;
    }

    apply_mean(network, grad, total_loss, batch.len(), learning_rate)
}

/// Same as `train_batch` but the examples are spread over the rayon thread pool.
pub fn par_train_batch(network: &mut Network, batch: &[Example], learning_rate: f32) -> Result<f32> {
    par_train_batch_with(network, batch, learning_rate, &HalfSquaredError)
}

/// Same as `train_batch_with` but the examples are spread over the rayon thread pool.
///
/// Each rayon job differentiates its share of the batch on its own copy of the network,
/// the partial gradients are summed before the single commit. The cached outputs and deltas
/// of `network` itself are not refreshed.
pub fn par_train_batch_with<L>(
    network: &mut Network,
    batch: &[Example],
    learning_rate: f32,
    loss: &L,
) -> Result<f32>
where
    L: LossFn + Sync + ?Sized,
{
    if batch.is_empty() {
        return Err(MlErr::EmptyDataset);
    }

    let size = network.num_params();
    let template: &Network = network;

    let (grad, total_loss) = batch
        .par_iter()
        .try_fold(
            || (template.clone(), vec![0.; size], 0.),
            |(mut local, mut grad, total), example| {
                let value = accumulate_gradient(&mut local, example, loss, &mut grad)?;
                Ok::<_, MlErr>((local, grad, total + value))
            },
        )
        .map(|partial| partial.map(|(_, grad, total)| (grad, total)))
        .try_reduce(
            || (vec![0.; size], 0.),
            |(mut acc, acc_loss), (grad, partial_loss)| {
                acc.iter_mut().zip(&grad).for_each(|(a, g)| *a += g);
                Ok((acc, acc_loss + partial_loss))
            },
        )?;

    apply_mean(network, grad, total_loss, batch.len(), learning_rate)
}

fn apply_mean(
    network: &mut Network,
    mut grad: Vec<f32>,
    total_loss: f32,
    n: usize,
    learning_rate: f32,
) -> Result<f32> {
    let n = n as f32;
    grad.iter_mut().for_each(|g| *g /= n);
    descend(network, &grad, learning_rate)?;

    Ok(total_loss / n)
}
