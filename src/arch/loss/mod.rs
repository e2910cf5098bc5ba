mod half_sse;
mod loss_fn;

pub use half_sse::HalfSquaredError;
pub use loss_fn::LossFn;
