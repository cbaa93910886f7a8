//! Hook-driven HTTP tasks.
//!
//! - [`Work`]: the trait a concrete task implements
//! - [`WorkData`]: what one execution produced
//! - [`WorkExt`]: `execute`, `start`, `upload`, `download` and the channel variants
//! - [`launch`]: spawned execution with a completion callback

pub mod data;
pub mod engine;
pub mod execute;
pub mod task;

pub use data::WorkData;
pub use engine::ExecuteOptions;
pub use execute::{launch, WorkExt};
pub use task::Work;
