//! Memory store proxy
//!
//! Stateless facade over the document store: chat turns per
//! (persona, session) plus one shared memory log.

pub mod api;
pub mod service;

pub use api::{create_router, start_server};
pub use service::MemoryService;
