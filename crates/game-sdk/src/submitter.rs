//! transaction submission and completion tracking
//!
//! no retries happen here: a rejected transaction (stale sequence number,
//! insufficient funds, ...) surfaces to the caller, who re-reads state and
//! rebuilds. dropping an `await_completion` future only stops local waiting;
//! the submitted transaction stays on its way to the chain.

use crate::{
    client::{NetworkClient, TransactionState},
    config::ClientConfig,
    error::{Result, SdkError},
    types::{SignedTransaction, TerminalStatus, TransactionHash},
};

use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

#[derive(Clone)]
pub struct TransactionSubmitter {
    network: Arc<dyn NetworkClient>,
    wait_timeout: Duration,
    poll_interval: Duration,
}

impl TransactionSubmitter {
    pub fn new(network: Arc<dyn NetworkClient>, config: &ClientConfig) -> Self {
        Self {
            network,
            wait_timeout: config.wait_timeout,
            poll_interval: config.poll_interval,
        }
    }

    pub fn wait_timeout(&self) -> Duration {
        self.wait_timeout
    }

    /// send a signed transaction; consumes it
    pub async fn submit(&self, txn: SignedTransaction) -> Result<TransactionHash> {
        self.network.submit_signed_transaction(&txn).await
    }

    /// poll until the chain reports success or failure, bounded by `wait_timeout`
    pub async fn await_completion(&self, hash: &TransactionHash) -> Result<TerminalStatus> {
        match tokio::time::timeout(self.wait_timeout, self.poll_until_terminal(hash)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("gave up waiting for {} after {:?}", hash, self.wait_timeout);
                Err(SdkError::Timeout {
                    hash: hash.to_string(),
                    waited: self.wait_timeout,
                })
            }
        }
    }

    pub async fn submit_and_wait(
        &self,
        txn: SignedTransaction,
    ) -> Result<(TransactionHash, TerminalStatus)> {
        let hash = self.submit(txn).await?;
        let status = self.await_completion(&hash).await?;
        Ok((hash, status))
    }

    async fn poll_until_terminal(&self, hash: &TransactionHash) -> Result<TerminalStatus> {
        loop {
            match self.network.transaction_by_hash(hash).await? {
                TransactionState::Committed(status) => {
                    info!("transaction {} committed: {}", hash, status.vm_status());
                    return Ok(status);
                }
                state => {
                    debug!("transaction {} {:?}, polling again", hash, state);
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}
