//! Export of saved regimen comparisons.

mod comparison;

pub use comparison::*;
