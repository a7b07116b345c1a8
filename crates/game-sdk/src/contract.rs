//! game contract client
//!
//! resolves a network profile once at construction and is a plain facade
//! afterwards: build payload, sign through the wallet, submit, wait.
//!
//! calls against the same account must be serialized by the caller;
//! concurrent `create_game`s race for the same sequence number.

use crate::{
    client::{NetworkClient, RestClient},
    config::{ClientConfig, Network, NetworkProfile},
    error::{Result, SdkError, SubmissionErrorKind},
    payload::{create_game_payload, CallDescription},
    submitter::TransactionSubmitter,
    types::{AccountAddress, TerminalStatus, TransactionHash, TypeTag},
    wallet::{LocalAccount, TestWallet, Wallet},
};

use std::sync::Arc;
use tracing::{info, warn};

/// arguments of `core::create_game`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateGameParams {
    /// coin deposited by players, e.g. `0x1::aptos_coin::AptosCoin`
    pub coin_type: String,
    pub game_name: String,
    /// deposit each player makes, in the coin's smallest unit
    pub amount_per_depositor: u64,
    /// payout split between winners
    pub withdrawal_fractions: Vec<u64>,
    /// how long the game accepts joins, in seconds
    pub join_duration_secs: u64,
}

pub struct GameContract {
    profile: NetworkProfile,
    wallet: Arc<dyn Wallet>,
    submitter: TransactionSubmitter,
}

impl GameContract {
    /// connect to a known network with its admin test wallet
    pub fn new(network: Network) -> Result<Self> {
        Self::with_config(network.profile(), ClientConfig::default())
    }

    pub fn with_config(profile: NetworkProfile, config: ClientConfig) -> Result<Self> {
        let client: Arc<dyn NetworkClient> = Arc::new(RestClient::new(&profile.node_url, &config)?);
        let account = LocalAccount::from_private_key_hex(&profile.admin_private_key)?;
        let wallet = TestWallet::new(account, client.clone()).with_defaults(config.transaction_options());

        info!(
            "game contract at {} on {} (admin {})",
            profile.contract_address,
            profile.name,
            wallet.address()
        );
        Ok(Self::from_parts(profile, client, Arc::new(wallet), &config))
    }

    /// assemble from already-built collaborators; any wallet variant works
    pub fn from_parts(
        profile: NetworkProfile,
        network: Arc<dyn NetworkClient>,
        wallet: Arc<dyn Wallet>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            profile,
            wallet,
            submitter: TransactionSubmitter::new(network, config),
        }
    }

    pub fn profile(&self) -> &NetworkProfile {
        &self.profile
    }

    pub fn contract_address(&self) -> AccountAddress {
        self.profile.contract_address
    }

    pub fn wallet(&self) -> &Arc<dyn Wallet> {
        &self.wallet
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }

    /// validated call description for `core::create_game`
    pub fn create_game_payload(&self, params: &CreateGameParams) -> Result<CallDescription> {
        if params.game_name.is_empty() {
            return Err(SdkError::Validation("game name must not be empty".into()));
        }
        params
            .coin_type
            .parse::<TypeTag>()
            .map_err(|e| SdkError::Validation(format!("coin type {:?}: {}", params.coin_type, e)))?;

        Ok(create_game_payload(
            self.contract_address(),
            &params.coin_type,
            &params.game_name,
            params.amount_per_depositor,
            &params.withdrawal_fractions,
            params.join_duration_secs,
        ))
    }

    /// create a game; returns once the chain has committed it
    pub async fn create_game(
        &self,
        coin_type: &str,
        game_name: &str,
        amount_per_depositor: u64,
        withdrawal_fractions: &[u64],
        join_duration_secs: u64,
    ) -> Result<TransactionHash> {
        let params = CreateGameParams {
            coin_type: coin_type.to_string(),
            game_name: game_name.to_string(),
            amount_per_depositor,
            withdrawal_fractions: withdrawal_fractions.to_vec(),
            join_duration_secs,
        };
        let call = self.create_game_payload(&params)?;
        let hash = self.sign_and_send(&call).await?;
        info!("created game {:?} in {}", game_name, hash);
        Ok(hash)
    }

    /// create several games from one batch signature pass
    ///
    /// transactions get consecutive sequence numbers, are submitted in input
    /// order and then awaited; the first failure aborts the rest
    pub async fn create_games(&self, games: &[CreateGameParams]) -> Result<Vec<TransactionHash>> {
        let calls = games
            .iter()
            .map(|g| self.create_game_payload(g))
            .collect::<Result<Vec<_>>>()?;
        let signed = self.wallet.sign_all_transactions(&calls).await?;

        let mut hashes = Vec::with_capacity(signed.len());
        for (index, txn) in signed.into_iter().enumerate() {
            match self.submitter.submit(txn).await {
                Ok(hash) => hashes.push(hash),
                Err(e) => {
                    if !hashes.is_empty() {
                        warn!(
                            "batch item {} rejected; {} earlier items already submitted: {:?}",
                            index,
                            hashes.len(),
                            hashes
                        );
                    }
                    return Err(SdkError::BatchItem {
                        index,
                        submitted: hashes,
                        source: Box::new(e),
                    });
                }
            }
        }

        for (index, hash) in hashes.iter().enumerate() {
            if let Err(e) = self.expect_success(hash).await {
                return Err(SdkError::BatchItem {
                    index,
                    submitted: hashes.clone(),
                    source: Box::new(e),
                });
            }
        }

        info!("created {} games", hashes.len());
        Ok(hashes)
    }

    async fn sign_and_send(&self, call: &CallDescription) -> Result<TransactionHash> {
        let signed = self.wallet.sign_transaction(call).await?;
        let hash = self.submitter.submit(signed).await?;
        self.expect_success(&hash).await?;
        Ok(hash)
    }

    async fn expect_success(&self, hash: &TransactionHash) -> Result<()> {
        match self.submitter.await_completion(hash).await? {
            TerminalStatus::Success { .. } => Ok(()),
            TerminalStatus::Failed { vm_status } => {
                let kind = match SubmissionErrorKind::classify(&vm_status) {
                    SubmissionErrorKind::Rejected => SubmissionErrorKind::ExecutionFailed,
                    kind => kind,
                };
                Err(SdkError::Submission {
                    kind,
                    message: format!("{} failed on chain: {}", hash, vm_status),
                })
            }
        }
    }
}
