//! test network faucet

use crate::{
    config::ClientConfig,
    error::{Result, SdkError, SubmissionErrorKind},
    submitter::TransactionSubmitter,
    types::{AccountAddress, TransactionHash},
};

use reqwest::Client;
use tracing::info;

pub struct FaucetClient {
    faucet_url: String,
    http: Client,
    submitter: TransactionSubmitter,
}

impl FaucetClient {
    /// the submitter is used to wait for the faucet's own transactions
    pub fn new(faucet_url: &str, submitter: TransactionSubmitter, config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SdkError::Config(format!("http client: {}", e)))?;

        Ok(Self {
            faucet_url: faucet_url.trim_end_matches('/').to_string(),
            http,
            submitter,
        })
    }

    pub fn mint_url(&self, address: AccountAddress, amount: u64) -> String {
        format!("{}/mint?amount={}&address={}", self.faucet_url, amount, address)
    }

    /// mint `amount` to `address` (creating the account if needed) and wait
    /// for the funding transactions to commit
    pub async fn fund_account(&self, address: AccountAddress, amount: u64) -> Result<Vec<TransactionHash>> {
        let response = self.http.post(self.mint_url(address, amount)).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SdkError::Network(format!("faucet returned {}: {}", status, body)));
        }

        let hashes: Vec<TransactionHash> = response.json().await?;
        for hash in &hashes {
            let status = self.submitter.await_completion(hash).await?;
            if !status.is_success() {
                return Err(SdkError::submission(
                    SubmissionErrorKind::ExecutionFailed,
                    format!("faucet transaction {} failed: {}", hash, status.vm_status()),
                ));
            }
        }

        info!("funded {} with {} ({} transactions)", address, amount, hashes.len());
        Ok(hashes)
    }
}
