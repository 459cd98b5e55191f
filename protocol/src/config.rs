//! # Protocol Configuration & Constants
//!
//! Every ledger-defined number the signing protocol depends on lives here.
//! If you're hardcoding a fee floor or a memo limit somewhere else, move it.
//!
//! The one piece of *runtime* configuration, the network passphrase, is not
//! a constant and not a global either: it is a [`Network`] value that callers
//! thread explicitly through composition and hashing. A digest computed for
//! the wrong network is a perfectly valid signature for a transaction that
//! nobody asked for, so we never let it come from ambient state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::crypto::hash::sha256_array;
use crate::error::SigningError;

// ---------------------------------------------------------------------------
// Network Passphrases
// ---------------------------------------------------------------------------

/// Public network (mainnet). Mistakes here cost real lumens.
pub const PUBLIC_NETWORK_PASSPHRASE: &str = "Public Global Stellar Network ; September 2015";

/// SDF test network. The default for every tool in this workspace.
pub const TESTNET_PASSPHRASE: &str = "Test SDF Network ; September 2015";

// ---------------------------------------------------------------------------
// Key & Signature Sizes
// ---------------------------------------------------------------------------

/// Raw Ed25519 public key length in bytes.
pub const PUBLIC_KEY_LENGTH: usize = 32;

/// Raw Ed25519 signature length. Always 64 bytes.
pub const SIGNATURE_LENGTH: usize = 64;

/// Signable digest length (SHA-256 output).
pub const DIGEST_LENGTH: usize = 32;

/// Signature hint length: the trailing bytes of the signer's public key.
pub const HINT_LENGTH: usize = 4;

/// Maximum decorated signatures a v1 envelope may carry (`signatures<20>`).
pub const MAX_SIGNATURES: usize = 20;

/// Maximum operations a transaction may carry (`operations<100>`).
pub const MAX_OPERATIONS: usize = 100;

// ---------------------------------------------------------------------------
// Fees, Amounts & Memos
// ---------------------------------------------------------------------------

/// Minimum base fee per operation, in stroops.
pub const MIN_BASE_FEE: u32 = 100;

/// Default base fee used by tooling when the caller does not specify one.
pub const DEFAULT_BASE_FEE: &str = "100";

/// Number of fractional digits the native asset supports.
pub const AMOUNT_DECIMALS: usize = 7;

/// Stroops per whole unit of the native asset (10^7).
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// Maximum `MEMO_TEXT` length in bytes (`string<28>`).
pub const MAX_MEMO_TEXT_LENGTH: usize = 28;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Validity window applied to composed transactions. The upper time bound is
/// `composition instant + DEFAULT_TX_TIMEOUT`.
pub const DEFAULT_TX_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Remote Signer
// ---------------------------------------------------------------------------

/// Largest frame the remote signer client will read or write. A signing
/// exchange is a few hundred bytes; anything near this is a broken peer.
pub const MAX_REMOTE_FRAME_LENGTH: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// The ledger network a transaction is built and hashed for.
///
/// Identified by its passphrase; the 32-byte network ID mixed into every
/// signable digest is `SHA-256(passphrase)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Network {
    passphrase: String,
}

impl Network {
    /// Creates a network from an arbitrary passphrase.
    ///
    /// # Errors
    ///
    /// Returns [`SigningError::InvalidNetworkIdentifier`] for an empty or
    /// whitespace-only passphrase. An unset environment variable must never
    /// quietly become "hash under the empty string".
    pub fn new(passphrase: impl Into<String>) -> Result<Self, SigningError> {
        let passphrase = passphrase.into();
        if passphrase.trim().is_empty() {
            return Err(SigningError::InvalidNetworkIdentifier);
        }
        Ok(Self { passphrase })
    }

    /// The public network.
    pub fn public() -> Self {
        Self {
            passphrase: PUBLIC_NETWORK_PASSPHRASE.to_string(),
        }
    }

    /// The SDF test network.
    pub fn testnet() -> Self {
        Self {
            passphrase: TESTNET_PASSPHRASE.to_string(),
        }
    }

    /// The passphrase this network is identified by.
    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }

    /// `SHA-256(passphrase)`, the value prefixed to every signature payload.
    pub fn network_id(&self) -> [u8; 32] {
        sha256_array(self.passphrase.as_bytes())
    }

    /// Short name for logging. Unknown networks get their network ID prefix.
    pub fn name(&self) -> String {
        match self.passphrase.as_str() {
            PUBLIC_NETWORK_PASSPHRASE => "public".to_string(),
            TESTNET_PASSPHRASE => "testnet".to_string(),
            _ => format!("custom({})", hex::encode(&self.network_id()[..4])),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}
