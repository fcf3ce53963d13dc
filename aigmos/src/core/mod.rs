//! Deterministic logic with no threads and no filesystem access.

pub mod expand;
pub mod ignore;
pub mod plan;
pub mod store;
pub mod symbol;
pub mod table;
pub mod trigger;
