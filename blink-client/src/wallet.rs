//! The signing capability an executor drives.
//!
//! Any binding (browser wallet bridge, custodial signer, test double) implementing
//! [`WalletAdapter`] can be plugged into an [`crate::executor::ActionExecutor`].
use async_trait::async_trait;
use blink_common::dto::EVMTransaction;
#[cfg(test)]
use mockall::automock;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalletError {
    #[error("Wallet connection failed: {0}")]
    Connection(String),

    #[error("Request rejected by the user")]
    Rejected,

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait WalletAdapter: Send + Sync {
    /// Connects the wallet, possibly waiting on user interaction, and returns the account address.
    async fn connect(&self) -> Result<String, WalletError>;

    /// Signs and broadcasts `transaction`, returning its hash.
    async fn sign_and_send_transaction(
        &self,
        transaction: &EVMTransaction,
    ) -> Result<String, WalletError>;

    fn is_connected(&self) -> bool;

    fn address(&self) -> Option<String>;
}
