pub mod boundary;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod gate;
pub mod git;
pub mod manifest;
pub mod release;
pub mod ui;

pub use error::{Result, VersionGateError};
pub use gate::{GateOptions, GateOutcome, VersionGate};
