//! Engine counters and internal balances that must survive restarts.

use crate::StoreError;
use gravity_types::{AccountAddress, EthAddress};

pub trait MetaStore {
    fn put_last_observed_nonce(&self, nonce: u64) -> Result<(), StoreError>;

    /// Zero when nothing has been observed yet.
    fn last_observed_nonce(&self) -> Result<u64, StoreError>;

    /// Overwrite an account's internal balance of a bridged token.
    fn put_balance(
        &self,
        account: &AccountAddress,
        token: &EthAddress,
        amount: u128,
    ) -> Result<(), StoreError>;

    /// Zero for accounts that never received the token.
    fn balance(&self, account: &AccountAddress, token: &EthAddress) -> Result<u128, StoreError>;
}
