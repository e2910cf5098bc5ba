use ndarray::{Array1, ArrayView1};

use super::Neuron;
use crate::{MlErr, Result, error::check_size, initialization::ParamGen};

/// A fully connected layer of sigmoid neurons sharing the same input.
#[derive(Clone, Debug)]
pub struct Layer {
    input_width: usize,
    neurons: Vec<Neuron>,
    output: Array1<f32>,
}

impl Layer {
    /// Creates a new `Layer`.
    ///
    /// # Arguments
    /// * `input_width` - The width of the input every neuron receives.
    /// * `width` - The amount of neurons.
    /// * `param_gen` - The generator for the initial parameters, sampled neuron by neuron.
    ///
    /// # Returns
    /// A new `Layer` or an error if either width is zero or the generator runs out.
    pub fn new<G: ParamGen + ?Sized>(
        input_width: usize,
        width: usize,
        param_gen: &mut G,
    ) -> Result<Self> {
        if input_width == 0 || width == 0 {
            return Err(MlErr::InvalidTopology(format!(
                "a layer needs a positive input width and width, got {input_width} and {width}"
            )));
        }

        let neurons = (0..width)
            .map(|_| Neuron::new(input_width, &mut *param_gen))
            .collect::<Result<_>>()?;

        Ok(Self {
            input_width,
            neurons,
            output: Array1::zeros(width),
        })
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    /// The amount of neurons in this layer.
    pub fn width(&self) -> usize {
        self.neurons.len()
    }

    /// Returns the size of this layer.
    ///
    /// # Returns
    /// The amount of parameters this layer has.
    pub fn size(&self) -> usize {
        self.width() * (self.input_width + 1)
    }

    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    pub fn output(&self) -> ArrayView1<'_, f32> {
        self.output.view()
    }

    /// Runs every neuron over the same `input` and caches the collected outputs.
    pub fn calc(&mut self, input: ArrayView1<f32>) -> Result<ArrayView1<'_, f32>> {
        check_size("layer input", input.len(), self.input_width)?;

        for (out, neuron) in self.output.iter_mut().zip(&mut self.neurons) {
            *out = neuron.calc(input)?;
        }

        Ok(self.output.view())
    }

    /// The flattened parameters: for each neuron in order, `[bias, weights...]`.
    pub fn flatten(&self) -> Vec<f32> {
        let mut params = Vec::with_capacity(self.size());
        self.neurons
            .iter()
            .for_each(|neuron| neuron.flatten_into(&mut params));

        params
    }

    /// Assigns `params` to the neurons in chunks of `input_width + 1`.
    ///
    /// # Errors
    /// `SizeMismatch` if `params` isn't exactly `size()` long, in which case nothing changes.
    pub fn unflatten(&mut self, params: &[f32]) -> Result<()> {
        check_size("layer params", params.len(), self.size())?;

        for (neuron, chunk) in self
            .neurons
            .iter_mut()
            .zip(params.chunks_exact(self.input_width + 1))
        {
            neuron.unflatten(chunk)?;
        }

        Ok(())
    }

    /// Sends every neuron's delta back through the weights that connect it to each input.
    ///
    /// # Returns
    /// `dE/dOut` for the layer feeding this one: for each input `i`, `Σ_k delta_k * w_k[i]`.
    pub fn back_distribute(&self) -> Array1<f32> {
        let mut d = Array1::zeros(self.input_width);
        for neuron in &self.neurons {
            d.scaled_add(neuron.delta(), &neuron.weights());
        }

        d
    }

    /// Computes and caches every neuron's delta from `dE/dOut` of this layer.
    pub(crate) fn set_deltas(&mut self, d_out: ArrayView1<f32>) -> Result<()> {
        check_size("layer error signal", d_out.len(), self.width())?;

        for (neuron, &d) in self.neurons.iter_mut().zip(d_out) {
            neuron.set_delta(d);
        }

        Ok(())
    }

    /// Adds the gradient given by the cached deltas to `grad`, laid out like `flatten`.
    pub(crate) fn accumulate_gradient(
        &self,
        prev_output: ArrayView1<f32>,
        grad: &mut [f32],
    ) -> Result<()> {
        check_size("layer gradient", grad.len(), self.size())?;

        for (neuron, chunk) in self
            .neurons
            .iter()
            .zip(grad.chunks_exact_mut(self.input_width + 1))
        {
            neuron.accumulate_gradient(prev_output, chunk)?;
        }

        Ok(())
    }

    /// Stages a gradient descent step for every neuron, `grad` laid out like `flatten`.
    pub(crate) fn stage(&mut self, grad: &[f32], learning_rate: f32) -> Result<()> {
        check_size("layer gradient", grad.len(), self.size())?;

        for (neuron, chunk) in self
            .neurons
            .iter_mut()
            .zip(grad.chunks_exact(self.input_width + 1))
        {
            neuron.stage(chunk, learning_rate)?;
        }

        Ok(())
    }

    pub fn commit(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::commit);
    }

    pub fn discard(&mut self) {
        self.neurons.iter_mut().for_each(Neuron::discard);
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;
    use crate::initialization::{ConstParamGen, RandParamGen};
    use rand::{SeedableRng, rngs::StdRng};

    fn random_layer(input_width: usize, width: usize) -> Layer {
        let rng = StdRng::seed_from_u64(7);
        let mut param_gen = RandParamGen::uniform(rng, usize::MAX, -1., 1.).unwrap();
        Layer::new(input_width, width, &mut param_gen).unwrap()
    }

    #[test]
    fn new_creates_width_neurons_of_input_width() {
        let layer = random_layer(3, 2);

        assert_eq!(layer.width(), 2);
        assert_eq!(layer.size(), 8);
        assert!(layer.neurons().iter().all(|n| n.input_width() == 3));
    }

    #[test]
    fn new_rejects_zero_widths() {
        let mut param_gen = ConstParamGen::new(0., usize::MAX);

        assert!(matches!(
            Layer::new(0, 2, &mut param_gen),
            Err(MlErr::InvalidTopology(_))
        ));
        assert!(matches!(
            Layer::new(2, 0, &mut param_gen),
            Err(MlErr::InvalidTopology(_))
        ));
    }

    #[test]
    fn flatten_is_neuron_major_bias_first() {
        let layer = random_layer(3, 2);
        let params = layer.flatten();

        assert_eq!(params.len(), 8);
        for (i, neuron) in layer.neurons().iter().enumerate() {
            assert_eq!(params[i * 4], neuron.bias());
            assert_eq!(&params[i * 4 + 1..i * 4 + 4], neuron.weights().to_vec());
        }
    }

    #[test]
    fn unflatten_chunks_per_neuron() {
        let mut layer = random_layer(3, 2);
        layer.unflatten(&[0., 1., 2., 3., 4., 5., 6., 7.]).unwrap();

        let [n0, n1] = layer.neurons() else {
            panic!("expected two neurons");
        };
        assert_eq!(n0.bias(), 0.);
        assert_eq!(n0.weights().to_vec(), vec![1., 2., 3.]);
        assert_eq!(n1.bias(), 4.);
        assert_eq!(n1.weights().to_vec(), vec![5., 6., 7.]);
    }

    #[test]
    fn unflatten_round_trips() {
        let mut layer = random_layer(4, 3);
        let params = layer.flatten();

        layer.unflatten(&params).unwrap();
        assert_eq!(layer.flatten(), params);
    }

    #[test]
    fn unflatten_rejects_wrong_length() {
        let mut layer = random_layer(3, 2);
        let before = layer.flatten();

        let err = layer.unflatten(&[0.; 7]).unwrap_err();
        assert!(matches!(
            err,
            MlErr::SizeMismatch {
                got: 7,
                expected: 8,
                ..
            }
        ));
        assert_eq!(layer.flatten(), before);
    }

    #[test]
    fn calc_collects_neuron_outputs() {
        let mut layer = random_layer(3, 2);
        layer.unflatten(&[0., 1., 1., 1., 0., 1., 1., 1.]).unwrap();

        let output = layer.calc(array![2., 2., 2.].view()).unwrap().to_vec();

        // sigmoid(6)
        for out in output {
            assert!((out - 0.997_527_376_843_365_3).abs() < 1e-6);
        }
        assert_eq!(layer.output().len(), 2);
    }

    #[test]
    fn calc_rejects_wrong_input_width() {
        let mut layer = random_layer(3, 2);
        assert!(layer.calc(array![1., 1.].view()).is_err());
    }

    #[test]
    fn back_distribute_uses_the_input_index_of_each_weight() {
        let mut layer = random_layer(2, 3);
        layer
            .unflatten(&[0., 1., 2., 0., 3., 4., 0., 5., 6.])
            .unwrap();
        layer.calc(array![0., 0.].view()).unwrap();

        // every output is 0.5, so each delta is d_out / 4
        layer.set_deltas(array![4., 8., -4.].view()).unwrap();
        let d = layer.back_distribute();

        assert_eq!(d.to_vec(), vec![1. + 6. - 5., 2. + 8. - 6.]);
    }
}
