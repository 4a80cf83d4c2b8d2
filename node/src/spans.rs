//! Pre-built [`tracing::Span`] constructors for node command handling.
//!
//! Consistent span names and fields make it easy to correlate a command
//! with the engine logs it produced.

use tracing::{info_span, Span};

/// Span covering one replayed command.
pub fn command_span(op: &str, line: u64) -> Span {
    info_span!("command", op = %op, line)
}

/// Span covering a validator claim.
pub fn claim_span(event_nonce: u64, claimant: &str) -> Span {
    info_span!("claim", event_nonce, claimant = %claimant)
}

/// Span covering a confirmation.
pub fn confirm_span(subject: &str, confirmer: &str) -> Span {
    info_span!("confirm", subject = %subject, confirmer = %confirmer)
}
