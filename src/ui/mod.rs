//! User interface module - terminal output for the operator.
//!
//! version-gate runs unattended, so there are no prompts; everything here is
//! formatting.

pub mod formatter;

pub use formatter::{
    display_boundary_warning, display_error, display_outcome, display_status, display_success,
    outcome_summary,
};
