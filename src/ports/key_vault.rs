use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum KeyVaultError {
    #[error("No key registered for wallet {0}")]
    UnknownWallet(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),
}

/// Opaque signing handle. Never exposes key material.
#[derive(Clone, PartialEq, Eq)]
pub struct SignerHandle {
    wallet: String,
    key_ref: String,
}

impl SignerHandle {
    pub fn new(wallet: impl Into<String>, key_ref: impl Into<String>) -> Self {
        Self {
            wallet: wallet.into(),
            key_ref: key_ref.into(),
        }
    }

    pub fn wallet(&self) -> &str {
        &self.wallet
    }

    /// Reference the executor hands back to the vault when signing
    pub fn key_ref(&self) -> &str {
        &self.key_ref
    }
}

impl fmt::Debug for SignerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerHandle")
            .field("wallet", &self.wallet)
            .field("key_ref", &"<redacted>")
            .finish()
    }
}

pub trait KeyVault: Send + Sync {
    fn signer(&self, wallet: &str) -> Result<SignerHandle, KeyVaultError>;
}
