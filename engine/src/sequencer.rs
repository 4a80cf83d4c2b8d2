//! Sequencer: releases observed attestations strictly in event-nonce order.

use gravity_types::Attestation;
use std::collections::BTreeMap;
use tracing::debug;

pub struct Sequencer {
    last_observed: u64,
    ready: BTreeMap<u64, Attestation>,
}

impl Sequencer {
    pub fn new(last_observed: u64) -> Self {
        Self {
            last_observed,
            ready: BTreeMap::new(),
        }
    }

    /// Highest nonce applied so far.
    pub fn last_observed(&self) -> u64 {
        self.last_observed
    }

    /// Queue an observed attestation. Nonces already applied or already
    /// queued are dropped.
    pub fn enqueue(&mut self, attestation: Attestation) -> bool {
        let nonce = attestation.event_nonce;
        if nonce <= self.last_observed || self.ready.contains_key(&nonce) {
            return false;
        }
        debug!(event_nonce = nonce, last_observed = self.last_observed, "queued for apply");
        self.ready.insert(nonce, attestation);
        true
    }

    pub fn is_queued(&self, event_nonce: u64) -> bool {
        self.ready.contains_key(&event_nonce)
    }

    /// The attestation at `last_observed + 1`, if it has been observed.
    pub fn peek_next(&self) -> Option<&Attestation> {
        self.ready.get(&(self.last_observed + 1))
    }

    /// Remove the next attestation and move `last_observed` forward by
    /// exactly one. Call only after the attestation has been applied.
    pub fn pop_next(&mut self) -> Option<Attestation> {
        let next = self.last_observed + 1;
        let attestation = self.ready.remove(&next)?;
        self.last_observed = next;
        Some(attestation)
    }

    /// Nonces waiting behind a gap.
    pub fn queued(&self) -> impl Iterator<Item = u64> + '_ {
        self.ready.keys().copied()
    }
}
