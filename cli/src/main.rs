// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Stellar HSM Operator Tool
//!
//! Entry point for the `stellar-hsm` binary. Parses CLI arguments,
//! initializes logging, and runs one pipeline stage (or the whole pipeline)
//! per invocation. Results are printed to stdout as JSON.
//!
//! - `compose`: build an unsigned payment envelope
//! - `digest`: hash an envelope for signing
//! - `assemble`: attach an externally produced signature
//! - `inspect`: decode and optionally verify an envelope
//! - `address`: convert between raw keys and account IDs
//! - `sign`: compose/digest/sign/assemble via the signer daemon
//! - `create-key`: provision a signing key in the HSM
//! - `ping`: check the signer daemon is up

mod cli;
mod logging;

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use clap::Parser;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use stellar_hsm_protocol::signer::remote::{RemoteKeyAdministration, UnixSocketConnector};
use stellar_hsm_protocol::signer::{
    provision_key, InMemoryKeyRegistry, KeyAdministration, KeyId, KeyRegistry, KeySpec,
    PublicKeyFormat, ScopedSigner,
};
use stellar_hsm_protocol::transaction::{
    self, verify_signature, PaymentRequest, SigningPipeline, TransactionEnvelope,
};
use stellar_hsm_protocol::{AccountId, Network, RawPublicKey};

use cli::{Commands, StellarHsmCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = StellarHsmCli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    let network = Network::new(cli.network.as_str()).context("invalid --network")?;
    tracing::debug!(network = %network, "using network");

    let output = match cli.command {
        Commands::Compose(args) => compose(args, &network)?,
        Commands::Digest(args) => digest(&args.envelope, &network)?,
        Commands::Assemble(args) => assemble(args)?,
        Commands::Inspect(args) => inspect(args, &network)?,
        Commands::Address(args) => address(&args.key)?,
        Commands::Sign(args) => sign(args, network).await?,
        Commands::CreateKey(args) => create_key(args).await?,
        Commands::Ping(args) => {
            UnixSocketConnector::new(&args.socket)
                .ping()
                .await
                .with_context(|| format!("signer at {} did not answer", args.socket.display()))?;
            json!({ "socket": args.socket.display().to_string(), "status": "ok" })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn payment_request(args: &cli::PaymentArgs) -> PaymentRequest {
    PaymentRequest::new(&args.source, &args.destination, &args.amount)
        .sequence(args.sequence)
        .fee(&args.fee)
        .maybe_memo(args.memo.clone())
        .timeout(Duration::from_secs(args.timeout))
}

fn compose(args: cli::PaymentArgs, network: &Network) -> Result<serde_json::Value> {
    let composed = payment_request(&args)
        .compose(network)
        .context("failed to compose payment")?;
    let digest = composed.digest()?;

    let seq_num = composed.envelope().tx().seq_num();
    tracing::info!(seq_num, "payment composed");
    Ok(json!({
        "network": network.passphrase(),
        "envelope": composed.envelope().to_base64(),
        "digest": digest.to_base64(),
        "digest_hex": digest.to_hex(),
    }))
}

fn parse_envelope(encoded: &str) -> Result<TransactionEnvelope> {
    TransactionEnvelope::from_base64(encoded).context("failed to decode envelope")
}

fn digest(envelope: &str, network: &Network) -> Result<serde_json::Value> {
    let envelope = parse_envelope(envelope)?;
    let digest = transaction::digest(&envelope, network)?;
    Ok(json!({
        "network": network.passphrase(),
        "digest": digest.to_base64(),
        "digest_hex": digest.to_hex(),
    }))
}

fn assemble(args: cli::AssembleArgs) -> Result<serde_json::Value> {
    let envelope = parse_envelope(&args.envelope)?;
    let public_key = parse_public_key(&args.public_key)?;
    let signature = BASE64
        .decode(args.signature.trim())
        .context("signature is not base64")?;

    let signed = transaction::assemble(&envelope, public_key.as_bytes(), &signature)
        .context("failed to assemble signature")?;
    Ok(json!({
        "envelope": signed.to_base64(),
        "signatures": signed.signatures().len(),
    }))
}

fn inspect(args: cli::InspectArgs, network: &Network) -> Result<serde_json::Value> {
    let envelope = parse_envelope(&args.envelope)?;
    let digest = transaction::digest(&envelope, network)?;

    let mut out = json!({
        "network": network.passphrase(),
        "digest": digest.to_base64(),
        "envelope": envelope,
    });
    if let Some(key) = args.public_key {
        let public_key = parse_public_key(&key)?;
        let error = verify_signature(&envelope, network, &public_key)
            .err()
            .map(|e| e.to_string());
        out["verification"] = json!({
            "account": public_key.account_id().to_string(),
            "valid": error.is_none(),
            "error": error,
        });
    }
    Ok(out)
}

fn address(key: &str) -> Result<serde_json::Value> {
    let public_key = parse_public_key(key)?;
    Ok(json!({
        "account_id": public_key.account_id().to_string(),
        "hex": public_key.to_hex(),
        "base64": public_key.to_base64(),
        "hint": transaction::hint(&public_key).to_string(),
    }))
}

/// Accepts an account ID, 64 hex characters, or base64 of 32 bytes.
fn parse_public_key(input: &str) -> Result<RawPublicKey> {
    let input = input.trim();
    if input.starts_with('G') {
        let account: AccountId = input.parse()?;
        return Ok(*account.public_key());
    }
    if input.len() == 64 && input.bytes().all(|b| b.is_ascii_hexdigit()) {
        let bytes = hex::decode(input).context("public key is not hex")?;
        return Ok(RawPublicKey::from_slice(&bytes)?);
    }
    Ok(RawPublicKey::from_base64(input)?)
}

async fn sign(args: cli::SignArgs, network: Network) -> Result<serde_json::Value> {
    let connector = UnixSocketConnector::new(&args.signer.socket);
    let key_id = KeyId::new(args.key_id.as_str());

    let public_key = match &args.public_key {
        Some(key) => parse_public_key(key)?,
        None => RemoteKeyAdministration::new(connector.clone())
            .export_public_key(&key_id, PublicKeyFormat::Raw)
            .await
            .with_context(|| format!("failed to export public key for {key_id}"))?,
    };

    let registry = InMemoryKeyRegistry::new();
    registry.record_public_key(key_id.clone(), public_key);

    let pipeline = SigningPipeline::new(
        network,
        Arc::new(ScopedSigner::new(connector)),
        Arc::new(registry),
    );

    let signed = match &args.envelope {
        Some(encoded) => {
            let envelope = parse_envelope(encoded)?;
            pipeline.sign_envelope(&envelope, &key_id).await
        }
        None => {
            let payment = cli::PaymentArgs {
                source: args
                    .source
                    .clone()
                    .unwrap_or_else(|| public_key.account_id().to_string()),
                sequence: args.sequence.context("--sequence is required")?,
                destination: args.destination.clone().context("--destination is required")?,
                amount: args.amount.clone().context("--amount is required")?,
                fee: args.fee.clone(),
                memo: args.memo.clone(),
                timeout: args.timeout,
            };
            pipeline
                .sign_payment(&payment_request(&payment), &key_id)
                .await
        }
    }
    .with_context(|| format!("signing with {key_id} failed"))?;

    Ok(serde_json::to_value(&signed)?)
}

async fn create_key(args: cli::CreateKeyArgs) -> Result<serde_json::Value> {
    let admin = RemoteKeyAdministration::new(UnixSocketConnector::new(&args.signer.socket));
    let registry = InMemoryKeyRegistry::new();

    let name = match args.name {
        Some(name) => KeyId::new(name),
        None => KeyId::generate(&args.prefix),
    };
    let mut spec = KeySpec::ed25519(name);
    spec.temporary = args.temporary;

    let (key_id, public_key) = provision_key(&admin, &registry, &spec)
        .await
        .context("failed to provision key")?;
    Ok(json!({
        "key_id": key_id,
        "account_id": public_key.account_id().to_string(),
        "public_key": public_key.to_base64(),
        "temporary": spec.temporary,
    }))
}
