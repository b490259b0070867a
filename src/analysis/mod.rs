//! Dataflow analyses over a [`Cfg`](crate::cfg::Cfg).
//!
//! - [`reachability`] - forward reachability from the entry block
//! - [`liveness`] - backward live variable analysis and dead stores
//!
//! Both only borrow the graph; their results are separate values.

pub mod liveness;
pub mod reachability;

pub use liveness::{DeadStore, LiveInfo, Liveness, VarSet};
pub use reachability::Reachability;
