//! Read-Model Update Path
//!
//! Turns incoming domain events into updates of the denormalized tables,
//! including popularity scoring and bounded feed fan-out.

mod service;

pub use service::{FanoutConfig, ReadStoreUpdateService};
