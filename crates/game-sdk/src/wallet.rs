//! signing wallets
//!
//! a `Wallet` turns call descriptions into signed transactions. two
//! variants ship here:
//! - `TestWallet` holds an ed25519 key in process
//! - `RemoteWallet` sends the signing message to an external signer
//!
//! both share the batch logic: the account's sequence number is read once,
//! every item gets `base + index` assigned up front, then items are built
//! and signed concurrently.

use crate::{
    client::{NetworkClient, TransactionOptions},
    error::{Result, SdkError},
    payload::CallDescription,
    types::{AccountAddress, RawTransaction, SignedTransaction, TransactionAuthenticator},
};

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// sequence number for item `index` of a batch read at `base`
pub fn assign_sequence_number(base: u64, index: usize) -> Result<u64> {
    u64::try_from(index)
        .ok()
        .and_then(|i| base.checked_add(i))
        .ok_or_else(|| {
            SdkError::Validation(format!("sequence number overflow: {} + {}", base, index))
        })
}

/// sequence numbers for a whole batch, in input order
pub fn assign_sequence_numbers(base: u64, count: usize) -> Result<Vec<u64>> {
    (0..count).map(|i| assign_sequence_number(base, i)).collect()
}

#[async_trait]
pub trait Wallet: Send + Sync {
    fn address(&self) -> AccountAddress;

    fn network(&self) -> &Arc<dyn NetworkClient>;

    /// options applied to every generated transaction
    fn defaults(&self) -> TransactionOptions {
        TransactionOptions::default()
    }

    /// produce the authenticator for one raw transaction
    async fn authenticate(&self, raw: &RawTransaction) -> Result<TransactionAuthenticator>;

    async fn sign_transaction(&self, call: &CallDescription) -> Result<SignedTransaction> {
        self.sign_with_options(call, self.defaults()).await
    }

    async fn sign_with_options(
        &self,
        call: &CallDescription,
        options: TransactionOptions,
    ) -> Result<SignedTransaction> {
        let raw = self
            .network()
            .generate_transaction(self.address(), call, options)
            .await?;
        let authenticator = self.authenticate(&raw).await?;
        debug!(
            "signed {} for {} at seq {}",
            call.function_id(),
            self.address(),
            raw.sequence_number
        );
        Ok(SignedTransaction::new(raw, authenticator))
    }

    /// sign a batch with consecutive sequence numbers starting at the
    /// account's current one; output order matches input order
    async fn sign_all_transactions(
        &self,
        calls: &[CallDescription],
    ) -> Result<Vec<SignedTransaction>> {
        if calls.is_empty() {
            return Ok(Vec::new());
        }

        let base = self.network().get_account(self.address()).await?.sequence_number;
        let sequence_numbers = assign_sequence_numbers(base, calls.len())?;
        debug!(
            "batch signing {} transactions for {} from seq {}",
            calls.len(),
            self.address(),
            base
        );

        let defaults = self.defaults();
        let signings = calls
            .iter()
            .zip(sequence_numbers)
            .map(|(call, seq)| self.sign_with_options(call, defaults.with_sequence_number(seq)));

        join_all(signings)
            .await
            .into_iter()
            .enumerate()
            .map(|(index, result)| {
                result.map_err(|e| SdkError::BatchItem {
                    index,
                    submitted: Vec::new(),
                    source: Box::new(e),
                })
            })
            .collect()
    }
}

// ============================================================================
// IN-PROCESS KEY
// ============================================================================

/// account backed by an ed25519 key held in memory
#[derive(Clone)]
pub struct LocalAccount {
    address: AccountAddress,
    key: SigningKey,
}

impl LocalAccount {
    /// account whose address is derived from the key
    pub fn new(key: SigningKey) -> Self {
        let address = AccountAddress::from_ed25519_public_key(&key.verifying_key().to_bytes());
        Self { address, key }
    }

    /// random key, for tests and local networks
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    /// `0x`-prefixed or bare 64 hex digits
    pub fn from_private_key_hex(private_key: &str) -> Result<Self> {
        let digits = private_key.trim().trim_start_matches("0x");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| SdkError::Config(format!("invalid private key: {}", e)))?;
        Ok(Self::new(SigningKey::from_bytes(&bytes)))
    }

    /// use an explicit address, for accounts whose key was rotated
    pub fn with_address(mut self, address: AccountAddress) -> Self {
        self.address = address;
        self
    }

    pub fn address(&self) -> AccountAddress {
        self.address
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.key.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.key.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for LocalAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalAccount")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// wallet holding its key material directly
pub struct TestWallet {
    account: LocalAccount,
    network: Arc<dyn NetworkClient>,
    defaults: TransactionOptions,
}

impl TestWallet {
    pub fn new(account: LocalAccount, network: Arc<dyn NetworkClient>) -> Self {
        Self {
            account,
            network,
            defaults: TransactionOptions::default(),
        }
    }

    /// options for every transaction; a sequence number here is ignored
    pub fn with_defaults(mut self, defaults: TransactionOptions) -> Self {
        self.defaults = defaults.without_sequence_number();
        self
    }

    pub fn account(&self) -> &LocalAccount {
        &self.account
    }
}

#[async_trait]
impl Wallet for TestWallet {
    fn address(&self) -> AccountAddress {
        self.account.address()
    }

    fn network(&self) -> &Arc<dyn NetworkClient> {
        &self.network
    }

    fn defaults(&self) -> TransactionOptions {
        self.defaults
    }

    async fn authenticate(&self, raw: &RawTransaction) -> Result<TransactionAuthenticator> {
        let message = raw.signing_message()?;
        Ok(TransactionAuthenticator::ed25519(
            self.account.public_key(),
            self.account.sign(&message),
        ))
    }
}

// ============================================================================
// REMOTE SIGNER
// ============================================================================

#[derive(Debug, Serialize)]
struct SignRequest {
    /// hex signing message
    message: String,
}

#[derive(Debug, Deserialize)]
struct SignResponse {
    /// hex ed25519 signature
    signature: String,
}

/// wallet whose key lives behind an http signer (hsm, custody service)
///
/// the signer receives `POST {url}/sign {"message": hex}` and answers
/// `{"signature": hex}`; signatures are checked locally before use
pub struct RemoteWallet {
    address: AccountAddress,
    public_key: VerifyingKey,
    signer_url: String,
    http: reqwest::Client,
    network: Arc<dyn NetworkClient>,
    defaults: TransactionOptions,
}

impl RemoteWallet {
    pub fn new(
        address: AccountAddress,
        public_key: [u8; 32],
        signer_url: &str,
        network: Arc<dyn NetworkClient>,
    ) -> Result<Self> {
        let public_key = VerifyingKey::from_bytes(&public_key)
            .map_err(|e| SdkError::Config(format!("invalid signer public key: {}", e)))?;

        Ok(Self {
            address,
            public_key,
            signer_url: signer_url.trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            network,
            defaults: TransactionOptions::default(),
        })
    }

    /// options for every transaction; a sequence number here is ignored
    pub fn with_defaults(mut self, defaults: TransactionOptions) -> Self {
        self.defaults = defaults.without_sequence_number();
        self
    }

    async fn request_signature(&self, message: &[u8]) -> Result<[u8; 64]> {
        let response = self
            .http
            .post(format!("{}/sign", self.signer_url))
            .json(&SignRequest {
                message: hex::encode(message),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SdkError::Signing(format!(
                "remote signer returned {}",
                response.status()
            )));
        }

        let body: SignResponse = response.json().await?;
        decode_signature(&body.signature)
    }
}

fn decode_signature(hex_signature: &str) -> Result<[u8; 64]> {
    let mut signature = [0u8; 64];
    hex::decode_to_slice(hex_signature.trim_start_matches("0x"), &mut signature)
        .map_err(|e| SdkError::Signing(format!("malformed signature: {}", e)))?;
    Ok(signature)
}

#[async_trait]
impl Wallet for RemoteWallet {
    fn address(&self) -> AccountAddress {
        self.address
    }

    fn network(&self) -> &Arc<dyn NetworkClient> {
        &self.network
    }

    fn defaults(&self) -> TransactionOptions {
        self.defaults
    }

    async fn authenticate(&self, raw: &RawTransaction) -> Result<TransactionAuthenticator> {
        let message = raw.signing_message()?;
        let signature = self.request_signature(&message).await?;

        self.public_key
            .verify(&message, &Signature::from_bytes(&signature))
            .map_err(|_| SdkError::Signing("remote signature does not verify".into()))?;

        Ok(TransactionAuthenticator::ed25519(
            self.public_key.to_bytes(),
            signature,
        ))
    }
}
