//! Block layout for emission.
//!
//! [`GreedyReordering`] picks the block order and [`linearize`] rewrites the
//! jumps of the laid-out blocks so fallthrough is used wherever possible.

pub mod greedy;
pub mod linearize;

pub use greedy::{GreedyReordering, Trace};
pub use linearize::linearize;
