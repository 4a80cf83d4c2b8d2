use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid account address: {0}")]
    InvalidAccount(String),

    #[error("invalid external address: {0}")]
    InvalidEthAddress(String),

    #[error("invalid quorum fraction {numerator}/{denominator}")]
    InvalidQuorum { numerator: u64, denominator: u64 },
}
