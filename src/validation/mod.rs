pub mod classifier;
pub mod orchestrator;

pub use classifier::{classify, Verdict};
pub use orchestrator::ValidationEngine;
