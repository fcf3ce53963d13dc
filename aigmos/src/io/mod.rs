//! Side-effecting helpers: configuration, files, directory walks and
//! SQLite snapshots.

pub mod config;
pub mod files;
pub mod snapshot;
pub mod walk;
