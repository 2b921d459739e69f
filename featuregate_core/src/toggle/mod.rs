//! Toggle, segment and rule definitions plus the evaluation engine.
mod eval;
mod models;
mod rules;

pub use eval::EvalDetail;
pub use models::*;
