//! Infrastructure Adapters
//!
//! Concrete implementations of the domain ports, following the Port/Adapter
//! pattern. The in-memory variants back tests and single-process
//! deployments; database- or broker-backed adapters slot in behind the same
//! traits without touching the event-application logic.

mod memory_store;
mod queue;

pub use memory_store::InMemoryReadStore;
pub use queue::InMemoryEventQueue;
