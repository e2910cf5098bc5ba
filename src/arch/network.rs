use std::ops::Range;

use ndarray::{Array1, ArrayView1};
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{Feedforward, Layer};
use crate::{
    MlErr, Result,
    error::check_size,
    initialization::{ParamGen, RandParamGen},
};

/// Which neighbour of a layer to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The layer closer to the input.
    Previous,
    /// The layer closer to the output.
    Next,
}

/// Looks up the layer next to `index`, `None` past either end of the network.
pub fn adjacent_layer(network: &Network, index: usize, direction: Direction) -> Option<&Layer> {
    match direction {
        Direction::Previous => index.checked_sub(1).and_then(|i| network.layer(i)),
        Direction::Next => index.checked_add(1).and_then(|i| network.layer(i)),
    }
}

/// A feedforward network: information flows forward when computing an output and backward
/// when computing the *deltas* of its layers.
///
/// The topology is fixed on construction, layer `i` takes as input the output of layer
/// `i - 1` and the first layer takes the network's input.
#[derive(Clone, Debug)]
pub struct Network {
    input_width: usize,
    layers: Vec<Layer>,
    input: Array1<f32>,
}

impl Network {
    /// Creates a new `Network` with every parameter drawn uniformly from `[-1, 1)`.
    ///
    /// # Arguments
    /// * `input_width` - The width of the inputs the network accepts.
    /// * `layer_widths` - The amount of neurons of each layer, from input to output.
    ///
    /// # Returns
    /// A new `Network` or `InvalidTopology` if any width is zero or there are no layers.
    pub fn new(input_width: usize, layer_widths: &[usize]) -> Result<Self> {
        Self::from_rng(input_width, layer_widths, rand::rng())
    }

    /// Same as `new` but reproducible, the parameters are drawn from a rng seeded with `seed`.
    pub fn seeded(input_width: usize, layer_widths: &[usize], seed: u64) -> Result<Self> {
        Self::from_rng(input_width, layer_widths, StdRng::seed_from_u64(seed))
    }

    fn from_rng<R: Rng>(input_width: usize, layer_widths: &[usize], rng: R) -> Result<Self> {
        let mut param_gen = RandParamGen::uniform(rng, usize::MAX, -1., 1.)?;
        Self::with_param_gen(input_width, layer_widths, &mut param_gen)
    }

    /// Creates a new `Network` whose parameters are sampled from `param_gen` in flattened order.
    pub fn with_param_gen<G: ParamGen + ?Sized>(
        input_width: usize,
        layer_widths: &[usize],
        param_gen: &mut G,
    ) -> Result<Self> {
        if layer_widths.is_empty() {
            return Err(MlErr::InvalidTopology(
                "a network needs at least one layer".into(),
            ));
        }

        let input_widths = std::iter::once(input_width).chain(layer_widths.iter().copied());
        let layers = input_widths
            .zip(layer_widths)
            .map(|(n, &m)| Layer::new(n, m, &mut *param_gen))
            .collect::<Result<_>>()?;

        Ok(Self {
            input_width,
            layers,
            input: Array1::zeros(input_width),
        })
    }

    pub fn input_width(&self) -> usize {
        self.input_width
    }

    pub fn layer_widths(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::width).collect()
    }

    /// The amount of layers.
    pub fn depth(&self) -> usize {
        self.layers.len()
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub(crate) fn layer_mut(&mut self, index: usize) -> Option<&mut Layer> {
        self.layers.get_mut(index)
    }

    /// Returns the amount of parameters in the network.
    pub fn num_params(&self) -> usize {
        self.layers.iter().map(Layer::size).sum()
    }

    /// The range each layer occupies in the flattened parameter vector.
    pub fn param_ranges(&self) -> Vec<Range<usize>> {
        let mut start = 0;
        self.layers
            .iter()
            .map(|layer| {
                let range = start..start + layer.size();
                start = range.end;
                range
            })
            .collect()
    }

    /// The input of the last `calc`.
    pub fn input(&self) -> ArrayView1<'_, f32> {
        self.input.view()
    }

    /// The output of the last `calc`.
    pub fn output(&self) -> ArrayView1<'_, f32> {
        match self.layers.last() {
            Some(layer) => layer.output(),
            None => self.input.view(),
        }
    }

    /// The input layer `index` received in the last `calc`.
    pub fn layer_input(&self, index: usize) -> ArrayView1<'_, f32> {
        match adjacent_layer(self, index, Direction::Previous) {
            Some(prev) => prev.output(),
            None => self.input.view(),
        }
    }

    /// Makes a forward pass through the network, caching the output of every layer.
    ///
    /// # Arguments
    /// * `input` - The input data, `input_width` long.
    ///
    /// # Returns
    /// The output of the last layer or `SizeMismatch` if `input` has the wrong width.
    pub fn calc(&mut self, input: &[f32]) -> Result<ArrayView1<'_, f32>> {
        check_size("network input", input.len(), self.input_width)?;
        self.input = Array1::from(input.to_vec());

        let mut x = self.input.view();
        for layer in self.layers.iter_mut() {
            x = layer.calc(x)?;
        }

        Ok(x)
    }

    /// The flattened parameters, each layer's `flatten` in layer order.
    pub fn flatten(&self) -> Vec<f32> {
        let mut params = Vec::with_capacity(self.num_params());
        self.layers
            .iter()
            .for_each(|layer| params.extend(layer.flatten()));

        params
    }

    /// Consumes `params` in layer sized chunks, in layer order.
    ///
    /// # Errors
    /// `SizeMismatch` if `params` isn't exactly `num_params()` long, in which case nothing
    /// changes.
    pub fn unflatten(&mut self, params: &[f32]) -> Result<()> {
        check_size("network params", params.len(), self.num_params())?;

        let ranges = self.param_ranges();
        for (layer, range) in self.layers.iter_mut().zip(ranges) {
            layer.unflatten(&params[range])?;
        }

        Ok(())
    }

    /// Stages a gradient descent step over the whole network, `grad` laid out like `flatten`.
    pub(crate) fn stage(&mut self, grad: &[f32], learning_rate: f32) -> Result<()> {
        check_size("network gradient", grad.len(), self.num_params())?;

        let ranges = self.param_ranges();
        for (layer, range) in self.layers.iter_mut().zip(ranges) {
            layer.stage(&grad[range], learning_rate)?;
        }

        Ok(())
    }

    pub fn commit(&mut self) {
        self.layers.iter_mut().for_each(Layer::commit);
    }

    pub fn discard(&mut self) {
        self.layers.iter_mut().for_each(Layer::discard);
    }
}

impl Feedforward for Network {
    fn forward(&mut self, x: &[f32]) -> Result<Vec<f32>> {
        Ok(self.calc(x)?.to_vec())
    }
}
