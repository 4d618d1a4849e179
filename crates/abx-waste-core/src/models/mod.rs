//! Domain models for the waste and impact engine.

mod catalog;
mod impact;
mod regimen;
mod waste;

pub use catalog::*;
pub use impact::*;
pub use regimen::*;
pub use waste::*;
