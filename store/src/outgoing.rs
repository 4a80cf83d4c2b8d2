//! Outgoing transfer, batch and logic call storage trait.

use crate::StoreError;
use gravity_types::{OutgoingBatch, OutgoingLogicCall, OutgoingTransfer};

pub trait OutgoingStore {
    /// Record an unbatched transfer in the pool.
    fn put_transfer(&self, transfer: &OutgoingTransfer) -> Result<(), StoreError>;

    /// Remove a transfer from the unbatched pool (batched or withdrawn).
    fn delete_transfer(&self, id: u64) -> Result<(), StoreError>;

    fn put_batch(&self, batch: &OutgoingBatch) -> Result<(), StoreError>;

    fn get_batch(&self, batch_nonce: u64) -> Result<OutgoingBatch, StoreError>;

    fn put_logic_call(&self, call: &OutgoingLogicCall) -> Result<(), StoreError>;
}
