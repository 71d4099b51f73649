//! codsync CLI - argument parsing shared with the binary.

pub mod config;

pub use config::Config;
