//! Measures of how well a model fits a set of examples.

use ndarray::ArrayView1;

use crate::{
    MlErr, Result,
    arch::{Feedforward, loss::LossFn},
    error::check_size,
    training::Example,
};

/// The euclidean distance between `a` and `b`.
///
/// # Errors
/// `SizeMismatch` if the vectors have different lengths.
pub fn vector_distance(a: &[f32], b: &[f32]) -> Result<f32> {
    check_size("compared vector", b.len(), a.len())?;

    let squared: f32 = a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum();
    Ok(squared.sqrt())
}

/// The mean of `vector_distance` over every pair.
///
/// # Errors
/// `EmptyDataset` if there are no pairs, `SizeMismatch` if any pair has different lengths.
pub fn avg_vector_distance<I, A, B>(pairs: I) -> Result<f32>
where
    I: IntoIterator<Item = (A, B)>,
    A: AsRef<[f32]>,
    B: AsRef<[f32]>,
{
    let mut total = 0.;
    let mut n = 0usize;

    for (a, b) in pairs {
        total += vector_distance(a.as_ref(), b.as_ref())?;
        n += 1;
    }

    if n == 0 {
        return Err(MlErr::EmptyDataset);
    }

    Ok(total / n as f32)
}

/// The cost of `model` over `examples`: the mean distance between its predictions and the
/// expected outputs.
pub fn evaluate_cost<F>(model: &mut F, examples: &[Example]) -> Result<f32>
where
    F: Feedforward + ?Sized,
{
    let pairs = examples
        .iter()
        .map(|example| -> Result<_> { Ok((model.forward(&example.input)?, &example.output)) })
        .collect::<Result<Vec<_>>>()?;

    avg_vector_distance(pairs)
}

/// The mean of `loss` between the predictions of `model` and the expected outputs.
pub fn mean_loss<F, L>(model: &mut F, examples: &[Example], loss: &L) -> Result<f32>
where
    F: Feedforward + ?Sized,
    L: LossFn + ?Sized,
{
    if examples.is_empty() {
        return Err(MlErr::EmptyDataset);
    }

    let mut total = 0.;
    for example in examples {
        let y_pred = model.forward(&example.input)?;
        check_size("expected output", example.output.len(), y_pred.len())?;

        total += loss.loss(
            ArrayView1::from(&y_pred[..]),
            ArrayView1::from(&example.output[..]),
        );
    }

    Ok(total / examples.len() as f32)
}

/// The index of the first greatest value of `values`, `None` if it's empty or holds a NaN.
pub fn index_of_max(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;

    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            return None;
        }

        match best {
            Some((_, max)) if x <= max => {}
            _ => best = Some((i, x)),
        }
    }

    best.map(|(i, _)| i)
}

/// The fraction of `examples` whose predicted class matches the expected one, the class
/// being the index of the greatest output.
pub fn calc_accuracy<F>(model: &mut F, examples: &[Example]) -> Result<f32>
where
    F: Feedforward + ?Sized,
{
    if examples.is_empty() {
        return Err(MlErr::EmptyDataset);
    }

    let mut hits = 0usize;
    for example in examples {
        let prediction = model.forward(&example.input)?;
        let expected = index_of_max(&example.output);

        if expected.is_some() && expected == index_of_max(&prediction) {
            hits += 1;
        }
    }

    Ok(hits as f32 / examples.len() as f32)
}

/// Approximates the diagonal of the jacobian of `f` at `input` with forward differences:
/// `(f(x + h * e_i)[i] - f(x)[i]) / h`.
///
/// # Errors
/// `SizeMismatch` if `f` doesn't return as many values as it takes, otherwise whatever `f`
/// fails with.
pub fn numerical_gradient<F>(mut f: F, input: &[f32], h: f32) -> Result<Vec<f32>>
where
    F: FnMut(&[f32]) -> Result<Vec<f32>>,
{
    let fx = f(input)?;
    check_size("function output", fx.len(), input.len())?;

    let mut shifted = input.to_vec();
    let mut grad = Vec::with_capacity(input.len());

    for i in 0..input.len() {
        shifted[i] += h;
        let fxh = f(&shifted)?;
        shifted[i] = input[i];

        check_size("function output", fxh.len(), input.len())?;
        grad.push((fxh[i] - fx[i]) / h);
    }

    Ok(grad)
}
