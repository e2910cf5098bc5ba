use log::debug;
use ndarray::ArrayView1;

use super::Example;
use crate::{
    MlErr, Result,
    arch::{
        Direction, Network, adjacent_layer,
        loss::{HalfSquaredError, LossFn},
    },
    error::check_size,
};

/// Makes a forward pass over `example` followed by a backward sweep from the output layer to
/// the input layer, adding the gradient of `loss` with respect to every parameter to `grad`.
///
/// Every neuron keeps the delta computed here. The live parameters are only read, so the
/// network is left as it was but for its cached outputs and deltas.
///
/// # Arguments
/// * `network` - The network to differentiate.
/// * `example` - The input and the output expected for it.
/// * `loss` - The loss function.
/// * `grad` - A buffer laid out like `Network::flatten` the gradient is added to.
///
/// # Returns
/// The loss of the forward pass.
pub(crate) fn accumulate_gradient<L>(
    network: &mut Network,
    example: &Example,
    loss: &L,
    grad: &mut [f32],
) -> Result<f32>
where
    L: LossFn + ?Sized,
{
    check_size("gradient", grad.len(), network.num_params())?;
    network.calc(&example.input)?;

    let expected = ArrayView1::from(&example.output[..]);
    check_size("expected output", expected.len(), network.output().len())?;
    let loss_value = loss.loss(network.output(), expected);

    let nlayers = network.depth();
    let missing_layer = |i| MlErr::SizeMismatch {
        what: "layers",
        got: i,
        expected: nlayers,
    };

    for (l, range) in network.param_ranges().into_iter().enumerate().rev() {
        // the output layer's error comes from the loss, the others' from the layer after them
        let d_out = match adjacent_layer(network, l, Direction::Next) {
            Some(next) => next.back_distribute(),
            None => loss.loss_prime(network.output(), expected),
        };
        debug!(layer = l; "dE/dOut = {d_out}");

        network
            .layer_mut(l)
            .ok_or_else(|| missing_layer(l))?
            .set_deltas(d_out.view())?;

        let layer = network.layer(l).ok_or_else(|| missing_layer(l))?;
        layer.accumulate_gradient(network.layer_input(l), &mut grad[range])?;
    }

    Ok(loss_value)
}

/// Computes the gradient of `loss` over a single example without updating the network.
///
/// # Returns
/// The gradient laid out like `Network::flatten`.
pub fn gradient<L>(network: &mut Network, example: &Example, loss: &L) -> Result<Vec<f32>>
where
    L: LossFn + ?Sized,
{
    let mut grad = vec![0.; network.num_params()];
    accumulate_gradient(network, example, loss, &mut grad)?;
    Ok(grad)
}

/// Stages `params - learning_rate * grad` over the whole network and commits it.
///
/// Either every neuron is updated or, on error, none is.
pub(crate) fn descend(network: &mut Network, grad: &[f32], learning_rate: f32) -> Result<()> {
    if let Err(e) = network.stage(grad, learning_rate) {
        network.discard();
        return Err(e);
    }

    network.commit();
    Ok(())
}

/// Trains `network` on a single example with the half squared error loss.
///
/// See `backpropagate_with`.
pub fn backpropagate(network: &mut Network, example: &Example, learning_rate: f32) -> Result<f32> {
    backpropagate_with(network, example, learning_rate, &HalfSquaredError)
}

/// Makes one gradient descent step over a single example.
///
/// The gradient of every layer is computed against the pre-update parameters of the layers
/// after it, the new parameters are only committed once the backward sweep is over. If any
/// width disagrees the step is aborted and the parameters stay untouched.
///
/// # Arguments
/// * `network` - The network to train.
/// * `example` - The input and the output expected for it.
/// * `learning_rate` - The length of the step.
/// * `loss` - The loss function.
///
/// # Returns
/// The loss of the forward pass, before the update.
pub fn backpropagate_with<L>(
    network: &mut Network,
    example: &Example,
    learning_rate: f32,
    loss: &L,
) -> Result<f32>
where
    L: LossFn + ?Sized,
{
    let mut grad = vec![0.; network.num_params()];
    let loss_value = accumulate_gradient(network, example, loss, &mut grad)?;
    descend(network, &grad, learning_rate)?;

    Ok(loss_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f32 = 1e-4;

    fn worked_example() -> Network {
        let mut network = Network::seeded(2, &[2, 2], 0).unwrap();
        network
            .unflatten(&[
                0.35, 0.15, 0.20, //
                0.35, 0.25, 0.30, //
                0.60, 0.40, 0.45, //
                0.60, 0.50, 0.55,
            ])
            .unwrap();

        network
    }

    #[test]
    fn output_layer_deltas() {
        let mut network = worked_example();
        let example = Example::new(vec![0.05, 0.10], vec![0.01, 0.99]);

        gradient(&mut network, &example, &HalfSquaredError).unwrap();

        let output = network.output().to_vec();
        assert!((output[0] - 0.751_365_07).abs() < TOLERANCE);
        assert!((output[1] - 0.772_928_47).abs() < TOLERANCE);

        let deltas: Vec<_> = network.layers()[1]
            .neurons()
            .iter()
            .map(|n| n.delta())
            .collect();
        assert!((deltas[0] - 0.138_498_56).abs() < TOLERANCE);
        assert!((deltas[1] + 0.038_098_24).abs() < TOLERANCE);
    }

    #[test]
    fn gradient_leaves_params_untouched() {
        let mut network = worked_example();
        let before = network.flatten();
        let example = Example::new(vec![0.05, 0.10], vec![0.01, 0.99]);

        let grad = gradient(&mut network, &example, &HalfSquaredError).unwrap();

        assert_eq!(grad.len(), before.len());
        assert_eq!(network.flatten(), before);
    }

    #[test]
    fn known_update() {
        let mut network = worked_example();
        let example = Example::new(vec![0.05, 0.10], vec![0.01, 0.99]);

        backpropagate(&mut network, &example, 0.5).unwrap();

        let expected = [
            0.3456, 0.14978, 0.1995, //
            0.3450, 0.24975, 0.2995, //
            0.53075, 0.35891, 0.4086, //
            0.61905, 0.51130, 0.5613,
        ];
        for (i, (got, want)) in network.flatten().iter().zip(expected).enumerate() {
            assert!((got - want).abs() < TOLERANCE, "param {i}: {got} vs {want}");
        }
    }

    #[test]
    fn mismatched_example_changes_nothing() {
        let mut network = worked_example();
        let before = network.flatten();

        let wrong_input = Example::new(vec![0.05], vec![0.01, 0.99]);
        let wrong_output = Example::new(vec![0.05, 0.10], vec![0.01, 0.99, 0.5]);

        for example in [wrong_input, wrong_output] {
            let err = backpropagate(&mut network, &example, 0.5).unwrap_err();
            assert!(matches!(err, MlErr::SizeMismatch { .. }));
            assert_eq!(network.flatten(), before);
            assert!(
                network
                    .layers()
                    .iter()
                    .flat_map(|l| l.neurons())
                    .all(|n| !n.is_staged())
            );
        }
    }
}
