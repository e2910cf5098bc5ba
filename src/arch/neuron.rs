use ndarray::{Array1, ArrayView1};

use super::activations::Sigmoid;
use crate::{MlErr, Result, error::check_size, initialization::ParamGen};

/// An immutable snapshot of a neuron's bias and weights.
#[derive(Clone, Debug, PartialEq)]
pub struct NeuronParams {
    bias: f32,
    weights: Array1<f32>,
}

impl NeuronParams {
    pub fn new(bias: f32, weights: Array1<f32>) -> Self {
        Self { bias, weights }
    }

    /// Builds the snapshot from its flattened `[bias, w_0, ..., w_n-1]` form.
    fn unflatten(raw: &[f32]) -> Option<Self> {
        let (&bias, weights) = raw.split_first()?;
        Some(Self::new(bias, Array1::from(weights.to_vec())))
    }

    pub fn bias(&self) -> f32 {
        self.bias
    }

    pub fn weights(&self) -> ArrayView1<'_, f32> {
        self.weights.view()
    }
}

/// A sigmoid unit: the smallest parameterized piece of a network.
///
/// The live (`committed`) parameters are only ever replaced by `commit`, which swaps in the
/// snapshot staged by the last backward pass. Until then every reader sees the old values.
#[derive(Clone, Debug)]
pub struct Neuron {
    committed: NeuronParams,
    staged: Option<NeuronParams>,
    output: f32,
    delta: f32,
}

impl Neuron {
    /// Creates a new `Neuron`.
    ///
    /// # Arguments
    /// * `input_width` - The amount of inputs, and therefore weights, of the neuron.
    /// * `param_gen` - The generator for the initial bias and weights, sampled in that order.
    ///
    /// # Returns
    /// A new `Neuron` or an error if the generator couldn't provide `input_width + 1` values.
    pub fn new<G: ParamGen + ?Sized>(input_width: usize, param_gen: &mut G) -> Result<Self> {
        let expected = input_width + 1;
        let raw = param_gen.sample_exact(expected)?;

        let params = NeuronParams::unflatten(&raw).ok_or(MlErr::ParamGenExhausted {
            got: raw.len(),
            expected,
        })?;

        Ok(Self::from_params(params))
    }

    /// Creates a new `Neuron` whose parameters are the given snapshot.
    pub fn from_params(params: NeuronParams) -> Self {
        Self {
            committed: params,
            staged: None,
            output: 0.,
            delta: 0.,
        }
    }

    pub fn input_width(&self) -> usize {
        self.committed.weights.len()
    }

    /// The amount of parameters of this neuron, its weights plus the bias.
    pub fn size(&self) -> usize {
        self.input_width() + 1
    }

    pub fn bias(&self) -> f32 {
        self.committed.bias
    }

    pub fn weights(&self) -> ArrayView1<'_, f32> {
        self.committed.weights()
    }

    pub fn params(&self) -> &NeuronParams {
        &self.committed
    }

    /// The output cached by the last `calc`.
    pub fn output(&self) -> f32 {
        self.output
    }

    /// The error term `dE/dNet` cached by the last backward pass.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn is_staged(&self) -> bool {
        self.staged.is_some()
    }

    /// Appends the flattened `[bias, weights...]` form of the live parameters to `out`.
    pub fn flatten_into(&self, out: &mut Vec<f32>) {
        out.push(self.committed.bias);
        out.extend(self.committed.weights.iter());
    }

    /// Replaces the live parameters from their flattened `[bias, weights...]` form.
    ///
    /// # Errors
    /// `SizeMismatch` if `raw` isn't exactly `input_width + 1` long.
    pub fn unflatten(&mut self, raw: &[f32]) -> Result<()> {
        check_size("neuron params", raw.len(), self.size())?;

        if let Some(params) = NeuronParams::unflatten(raw) {
            self.committed = params;
        }

        Ok(())
    }

    /// Σ weight[j] * input[j].
    pub fn weighted_sum(&self, input: ArrayView1<f32>) -> Result<f32> {
        check_size("neuron input", input.len(), self.input_width())?;
        Ok((&self.committed.weights * &input).sum())
    }

    /// Computes the activation of this neuron for `input` and caches it as its output.
    pub fn calc(&mut self, input: ArrayView1<f32>) -> Result<f32> {
        let net = self.committed.bias + self.weighted_sum(input)?;
        self.output = Sigmoid::f(net);
        Ok(self.output)
    }

    /// Turns `dE/dOut` into this neuron's delta using the output of the last `calc`.
    pub(crate) fn set_delta(&mut self, d_out: f32) -> f32 {
        self.delta = d_out * Sigmoid::df(self.output);
        self.delta
    }

    /// Adds this neuron's gradient, `[delta, delta * prev_output...]`, to `grad`.
    pub(crate) fn accumulate_gradient(
        &self,
        prev_output: ArrayView1<f32>,
        grad: &mut [f32],
    ) -> Result<()> {
        check_size("neuron gradient", grad.len(), self.size())?;
        check_size("previous output", prev_output.len(), self.input_width())?;

        let (db, dw) = grad.split_at_mut(1);
        db[0] += self.delta;
        for (g, &x) in dw.iter_mut().zip(prev_output) {
            *g += self.delta * x;
        }

        Ok(())
    }

    /// Stages `params - learning_rate * grad` without touching the live parameters.
    pub(crate) fn stage(&mut self, grad: &[f32], learning_rate: f32) -> Result<()> {
        check_size("neuron gradient", grad.len(), self.size())?;

        let (db, dw) = grad.split_at(1);
        let mut weights = self.committed.weights.clone();
        weights.scaled_add(-learning_rate, &ArrayView1::from(dw));

        self.staged = Some(NeuronParams::new(
            self.committed.bias - learning_rate * db[0],
            weights,
        ));

        Ok(())
    }

    /// Replaces the live parameters with the staged ones, if any.
    pub fn commit(&mut self) {
        if let Some(staged) = self.staged.take() {
            self.committed = staged;
        }
    }

    /// Drops the staged parameters, if any.
    pub fn discard(&mut self) {
        self.staged = None;
    }
}
