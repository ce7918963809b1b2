//! Subcommand implementations

pub mod explain;
pub mod pack;
pub mod printf;
pub mod unpack;
