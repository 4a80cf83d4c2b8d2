//! Valset storage trait. Valsets are append-only.

use crate::StoreError;
use gravity_types::Valset;

pub trait ValsetStore {
    fn put_valset(&self, valset: &Valset) -> Result<(), StoreError>;

    fn get_valset(&self, nonce: u64) -> Result<Valset, StoreError>;

    fn latest_valset_nonce(&self) -> Result<Option<u64>, StoreError>;
}
