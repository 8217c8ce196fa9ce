//! CLI subcommands

pub mod metrics;
pub mod replay;
