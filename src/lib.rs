pub use strata_core::*;
pub use strata_macros::*;
