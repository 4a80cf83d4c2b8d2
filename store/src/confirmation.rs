//! Confirmation storage trait. Confirmations are append-only.

use crate::StoreError;
use gravity_types::{ConfirmSubject, Confirmation};

pub trait ConfirmationStore {
    fn put_confirmation(&self, confirmation: &Confirmation) -> Result<(), StoreError>;

    fn get_confirmations(&self, subject: &ConfirmSubject) -> Result<Vec<Confirmation>, StoreError>;
}
