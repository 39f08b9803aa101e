//! Pure formatting functions for UI output.
//!
//! Status lines go to stdout, errors and warnings to stderr, styled with `console`
//! (colors drop out automatically when the output is not a terminal).

use console::style;

use crate::boundary::BoundaryWarning;
use crate::gate::GateOutcome;

/// Format and print an error message in red.
pub fn display_error(message: &str) {
    eprintln!("{} {}", style("ERROR:").red().bold(), message);
}

/// Format and print a success message with green checkmark.
pub fn display_success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Format and print a status message with yellow arrow.
pub fn display_status(message: &str) {
    println!("{} {}", style("→").yellow(), message);
}

/// Display a boundary warning to the user.
pub fn display_boundary_warning(warning: &BoundaryWarning) {
    eprintln!("{} {}", style("⚠ WARNING:").yellow(), warning);
}

/// One-line summary of a gate run
pub fn outcome_summary(outcome: &GateOutcome) -> String {
    match outcome {
        GateOutcome::Released { tag, release, .. } => {
            match release.as_ref().and_then(|r| r.html_url.as_deref()) {
                Some(url) => format!("Released {} ({})", tag, url),
                None => format!("Released {}", tag),
            }
        }
        GateOutcome::AlreadyTagged { tag, .. } => {
            format!("{} already exists; nothing to release", tag)
        }
        GateOutcome::LostRace { tag, .. } => {
            format!("{} was pushed by a concurrent run; nothing left to do", tag)
        }
        GateOutcome::ReleaseRepaired { tag, .. } => {
            format!("Created missing release for existing tag {}", tag)
        }
        GateOutcome::DryRun { tag, proceed, .. } => {
            if *proceed {
                format!("Dry run: would create tag {} and its release", tag)
            } else {
                format!("Dry run: {} already exists; would do nothing", tag)
            }
        }
    }
}

/// Display the final outcome of a gate run.
pub fn display_outcome(outcome: &GateOutcome) {
    let summary = outcome_summary(outcome);
    if outcome.released() {
        display_success(&summary);
    } else {
        display_status(&summary);
    }
}
