//! Subcommand implementations.

pub mod config_cmd;
pub mod fingerprint;
pub mod input;
pub mod pack;
pub mod verify;
