//! Wallet capability: deriving the paying address and signing intents.

use alloy_primitives::{Address, B256, Signature};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{error::SigningError, intent::StructuredIntent};

/// Something that can sign intent hashes on behalf of a wallet.
pub trait IntentSigner: Send + Sync {
    /// The wallet address of the signer.
    fn address(&self) -> Address;

    /// Sign a 32-byte EIP-712 hash.
    fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error>;
}

impl IntentSigner for PrivateKeySigner {
    fn address(&self) -> Address {
        alloy_signer::Signer::address(self)
    }

    fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        self.sign_hash_sync(hash)
    }
}

impl<T: IntentSigner + ?Sized> IntentSigner for Arc<T> {
    fn address(&self) -> Address {
        (**self).address()
    }

    fn sign_hash(&self, hash: &B256) -> Result<Signature, alloy_signer::Error> {
        (**self).sign_hash(hash)
    }
}

/// Parse a hex private key, with or without a `0x` prefix.
pub fn signer_from_key(private_key: &str) -> Result<PrivateKeySigner, SigningError> {
    let key = private_key.trim();
    if key.is_empty() {
        return Err(SigningError::MissingKey);
    }
    let key = key.strip_prefix("0x").unwrap_or(key);
    let bytes = hex::decode(key).map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    PrivateKeySigner::from_slice(&bytes).map_err(|e| SigningError::InvalidKey(e.to_string()))
}

/// The wallet address for a private key, or `None` if there is no usable key.
pub fn derive_address(private_key: Option<&str>) -> Option<Address> {
    match signer_from_key(private_key?) {
        Ok(signer) => Some(signer.address()),
        Err(SigningError::MissingKey) => None,
        Err(e) => {
            warn!("Could not derive wallet address: {e}");
            None
        }
    }
}

/// Sign an intent and return the `0x`-prefixed 65-byte signature.
pub fn try_sign_intent(intent: &StructuredIntent, signer: &dyn IntentSigner) -> Result<String, SigningError> {
    let hash = intent.signing_hash()?;
    let signature = signer.sign_hash(&hash)?;
    Ok(format!("0x{}", hex::encode(signature.as_bytes())))
}

/// Sign an intent if a signer is available.
///
/// Signing problems are logged and reported as `None`.
pub fn sign_intent(intent: &StructuredIntent, signer: Option<&dyn IntentSigner>) -> Option<String> {
    let Some(signer) = signer else {
        debug!("No signer configured; sending intent unsigned");
        return None;
    };
    match try_sign_intent(intent, signer) {
        Ok(signature) => Some(signature),
        Err(e) => {
            warn!("Failed signing payment intent: {e}");
            None
        }
    }
}
