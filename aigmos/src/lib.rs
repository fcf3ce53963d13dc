//! aigmos: a deterministic command console over a symbolic store.
//!
//! Every input line runs through one pipeline: the surface gate admits only
//! aliases and `help`, expansion rewrites the tokens to a fixpoint, and the
//! resulting `sys.*` primitive is dispatched from the registry.
//!
//! - **[`core`]**: Pure, deterministic logic (store shapes, symbols,
//!   expansion, triggers, `.ignore` rules, planning). No threads, no I/O.
//! - **[`io`]**: Side-effecting helpers (config, files, directory walks,
//!   SQLite snapshots).
//!
//! [`console`] owns the pipeline; [`topics`] holds the command families;
//! [`jobs`] and [`bus`] run background runners and event bindings.

pub mod alias;
pub mod bus;
pub mod console;
pub mod core;
pub mod exit_codes;
pub mod help;
pub mod io;
pub mod jobs;
pub mod logging;
pub mod registry;
pub mod repl;
pub mod reply;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod topics;
