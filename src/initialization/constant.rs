use super::ParamGen;

/// Yields the same value every time, up to `budget` values in total.
#[derive(Debug, Clone)]
pub struct ConstParamGen {
    value: f32,
    budget: usize,
}

impl ConstParamGen {
    pub fn new(value: f32, budget: usize) -> Self {
        Self { value, budget }
    }
}

impl ParamGen for ConstParamGen {
    fn sample(&mut self, n: usize) -> Option<Vec<f32>> {
        let take = n.min(self.budget);
        (self.budget > 0).then(|| {
            self.budget -= take;
            vec![self.value; take]
        })
    }
}
