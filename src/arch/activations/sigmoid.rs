/// The logistic activation `1 / (1 + e^-z)`.
#[derive(Clone, Copy, Debug, Default)]
pub struct Sigmoid;

impl Sigmoid {
    pub fn f(z: f32) -> f32 {
        1. / (1. + (-z).exp())
    }

    /// Derivative of the sigmoid expressed through its own output `a = f(z)`.
    pub fn df(a: f32) -> f32 {
        a * (1. - a)
    }
}
