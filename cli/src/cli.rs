//! # CLI Interface
//!
//! Command-line structure for `stellar-hsm` using `clap` derive. Offline
//! subcommands (`compose`, `digest`, `assemble`, `inspect`, `address`) never
//! touch the signer; `sign`, `create-key` and `ping` talk to a signer daemon
//! over its Unix socket.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use stellar_hsm_protocol::config::TESTNET_PASSPHRASE;

use crate::logging::LogFormat;

/// External-key signing for Stellar payments.
#[derive(Parser, Debug)]
#[command(
    name = "stellar-hsm",
    about = "Compose, hash and HSM-sign Stellar payments",
    version,
    propagate_version = true
)]
pub struct StellarHsmCli {
    /// Network passphrase transactions are built and hashed for.
    #[arg(
        long,
        global = true,
        env = "NETWORK_PASSPHRASE",
        default_value = TESTNET_PASSPHRASE
    )]
    pub network: String,

    /// Log output format. Logs always go to stderr.
    #[arg(
        long,
        global = true,
        value_enum,
        env = "STELLAR_HSM_LOG_FORMAT",
        default_value = "pretty"
    )]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an unsigned payment envelope and print it with its digest.
    Compose(PaymentArgs),
    /// Print the signable digest of a base64 envelope.
    Digest(EnvelopeArgs),
    /// Append a signature produced elsewhere to a base64 envelope.
    Assemble(AssembleArgs),
    /// Decode an envelope and optionally verify a signer's signature on it.
    Inspect(InspectArgs),
    /// Convert a public key between raw (hex/base64) and account ID forms.
    Address(AddressArgs),
    /// Sign a payment (or an existing envelope) through the signer daemon.
    Sign(SignArgs),
    /// Create a key in the signer and print its account ID.
    CreateKey(CreateKeyArgs),
    /// Check the signer daemon is reachable.
    Ping(SocketArgs),
}

/// Inputs for a single native payment.
#[derive(Args, Debug, Clone)]
pub struct PaymentArgs {
    /// Source account ID (G...).
    #[arg(long)]
    pub source: String,

    /// Source account's current sequence number.
    #[arg(long)]
    pub sequence: i64,

    /// Destination account ID (G...).
    #[arg(long)]
    pub destination: String,

    /// Amount in units, up to 7 decimal places.
    #[arg(long)]
    pub amount: String,

    /// Base fee in stroops.
    #[arg(long, default_value = "100")]
    pub fee: String,

    /// Text memo, at most 28 bytes.
    #[arg(long)]
    pub memo: Option<String>,

    /// Seconds the transaction stays valid. 0 disables the upper bound.
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct EnvelopeArgs {
    /// Base64 XDR transaction envelope.
    #[arg(long)]
    pub envelope: String,
}

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Base64 XDR transaction envelope.
    #[arg(long)]
    pub envelope: String,

    /// Signer's public key: account ID, 64 hex chars, or base64.
    #[arg(long)]
    pub public_key: String,

    /// Raw 64-byte signature, base64.
    #[arg(long)]
    pub signature: String,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Base64 XDR transaction envelope.
    #[arg(long)]
    pub envelope: String,

    /// Verify a signature by this key (account ID, hex, or base64).
    #[arg(long)]
    pub public_key: Option<String>,
}

#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Account ID, 64 hex chars, or base64 of a 32-byte key.
    pub key: String,
}

#[derive(Args, Debug)]
pub struct SocketArgs {
    /// Path of the signer daemon's Unix socket.
    #[arg(long, env = "HSM_SIGNER_SOCKET")]
    pub socket: PathBuf,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    #[command(flatten)]
    pub signer: SocketArgs,

    /// Identifier of the signing key in the HSM.
    #[arg(long)]
    pub key_id: String,

    /// Signing key's public key. Exported from the signer when omitted.
    #[arg(long)]
    pub public_key: Option<String>,

    /// Sign this base64 envelope instead of composing a payment.
    #[arg(long, conflicts_with_all = ["source", "sequence", "destination", "amount", "memo"])]
    pub envelope: Option<String>,

    /// Source account ID (G...). Defaults to the signing key's account.
    #[arg(long)]
    pub source: Option<String>,

    #[arg(long, required_unless_present = "envelope")]
    pub sequence: Option<i64>,

    #[arg(long, required_unless_present = "envelope")]
    pub destination: Option<String>,

    #[arg(long, required_unless_present = "envelope")]
    pub amount: Option<String>,

    #[arg(long, default_value = "100")]
    pub fee: String,

    #[arg(long)]
    pub memo: Option<String>,

    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
}

#[derive(Args, Debug)]
pub struct CreateKeyArgs {
    #[command(flatten)]
    pub signer: SocketArgs,

    /// Key name. A `<prefix>_<random>` name is generated when omitted.
    #[arg(long)]
    pub name: Option<String>,

    /// Prefix for generated key names.
    #[arg(long, default_value = "stellar")]
    pub prefix: String,

    /// Create a session-scoped key the signer discards on disconnect.
    #[arg(long)]
    pub temporary: bool,
}
