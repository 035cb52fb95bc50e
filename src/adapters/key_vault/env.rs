use std::collections::HashMap;
use std::path::PathBuf;

use crate::domain::is_valid_address;
use crate::ports::{KeyVault, KeyVaultError, SignerHandle};

pub const DEFAULT_ENV_PREFIX: &str = "GIGABRAIN_KEY";

/// Resolves wallets to key references without ever loading key material.
///
/// Lookup order: an explicitly registered keypair file, then the
/// `<PREFIX>_<WALLET>` environment variable.
#[derive(Debug, Clone)]
pub struct EnvKeyVault {
    prefix: String,
    keypair_files: HashMap<String, PathBuf>,
}

impl Default for EnvKeyVault {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX)
    }
}

impl EnvKeyVault {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            keypair_files: HashMap::new(),
        }
    }

    pub fn with_keypair_file(mut self, wallet: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.keypair_files.insert(wallet.into(), path.into());
        self
    }

    pub fn env_var(&self, wallet: &str) -> String {
        format!("{}_{}", self.prefix, wallet)
    }
}

impl KeyVault for EnvKeyVault {
    fn signer(&self, wallet: &str) -> Result<SignerHandle, KeyVaultError> {
        if !is_valid_address(wallet) {
            return Err(KeyVaultError::InvalidAddress(wallet.to_string()));
        }

        if let Some(path) = self.keypair_files.get(wallet) {
            if path.exists() {
                return Ok(SignerHandle::new(wallet, format!("file:{}", path.display())));
            }
            tracing::warn!("Keypair file for {} not found at {}", wallet, path.display());
        }

        let var = self.env_var(wallet);
        match std::env::var(&var) {
            Ok(value) if !value.trim().is_empty() => Ok(SignerHandle::new(wallet, format!("env:{}", var))),
            _ => Err(KeyVaultError::UnknownWallet(wallet.to_string())),
        }
    }
}
