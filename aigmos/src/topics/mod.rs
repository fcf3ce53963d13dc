//! Command families. Each topic exports its `sys.*` primitives as a const
//! table; the console registers all of them at construction.

pub mod events;
pub mod io;
pub mod kvlists;
pub mod lists;
pub mod planner;
pub mod qchat;
pub mod runner;
pub mod surface;
pub mod texts;

use crate::registry::CommandSpec;

pub fn all_commands() -> impl Iterator<Item = &'static CommandSpec> {
    [
        surface::COMMANDS,
        kvlists::COMMANDS,
        lists::COMMANDS,
        texts::COMMANDS,
        runner::COMMANDS,
        events::COMMANDS,
        io::COMMANDS,
        planner::COMMANDS,
        qchat::COMMANDS,
    ]
    .into_iter()
    .flatten()
}
