//! in-memory ledger
//!
//! implements `NetworkClient` without a node: tracks per-account sequence
//! numbers, checks signatures, and reports transactions through the same
//! pending -> committed lifecycle a fullnode does. knobs let tests inject
//! rejections, aborts and transactions that never finalize.

use crate::{
    client::{AccountInfo, LedgerInfo, NetworkClient, TransactionState},
    error::{Result, SdkError, SubmissionErrorKind},
    types::{AccountAddress, SignedTransaction, TerminalStatus, TransactionHash},
};

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

pub const MOCK_CHAIN_ID: u8 = 4;
pub const MOCK_GAS_PRICE: u64 = 100;

#[derive(Default)]
struct Ledger {
    accounts: HashMap<AccountAddress, u64>,
    transactions: HashMap<TransactionHash, MockTransaction>,
    submitted: Vec<SignedTransaction>,
    /// keyed by submission attempt, counted from zero
    rejections: HashMap<usize, (SubmissionErrorKind, String)>,
    account_reads: usize,
    status_lookups: usize,
    submission_attempts: usize,
}

struct MockTransaction {
    polls_until_final: usize,
    outcome: TerminalStatus,
}

pub struct MockNetwork {
    ledger: Mutex<Ledger>,
    chain_id: u8,
    gas_price: u64,
    pending_polls: usize,
    finalize: bool,
    abort_with: Option<String>,
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            ledger: Mutex::new(Ledger::default()),
            chain_id: MOCK_CHAIN_ID,
            gas_price: MOCK_GAS_PRICE,
            pending_polls: 0,
            finalize: true,
            abort_with: None,
        }
    }

    pub fn with_account(self, address: AccountAddress, sequence_number: u64) -> Self {
        self.ledger.lock().accounts.insert(address, sequence_number);
        self
    }

    /// report every transaction as pending this many times before committing
    pub fn with_pending_polls(mut self, polls: usize) -> Self {
        self.pending_polls = polls;
        self
    }

    /// accepted transactions stay pending forever
    pub fn never_finalize(mut self) -> Self {
        self.finalize = false;
        self
    }

    /// commit every transaction as failed with this vm status
    pub fn abort_execution(mut self, vm_status: impl Into<String>) -> Self {
        self.abort_with = Some(vm_status.into());
        self
    }

    /// fail the next submission as if the node had refused it
    pub fn reject_next_submission(&self, kind: SubmissionErrorKind, message: impl Into<String>) {
        let mut ledger = self.ledger.lock();
        let attempt = ledger.submission_attempts;
        ledger.rejections.insert(attempt, (kind, message.into()));
    }

    /// fail the `attempt`-th submission (zero based, counting rejected ones)
    pub fn reject_submission(&self, attempt: usize, kind: SubmissionErrorKind, message: impl Into<String>) {
        self.ledger.lock().rejections.insert(attempt, (kind, message.into()));
    }

    /// move an account's sequence number, e.g. to simulate another sender
    pub fn set_sequence_number(&self, address: AccountAddress, sequence_number: u64) {
        self.ledger.lock().accounts.insert(address, sequence_number);
    }

    pub fn sequence_number(&self, address: AccountAddress) -> Option<u64> {
        self.ledger.lock().accounts.get(&address).copied()
    }

    pub fn chain_id(&self) -> u8 {
        self.chain_id
    }

    pub fn gas_price(&self) -> u64 {
        self.gas_price
    }

    /// transactions accepted so far, in submission order
    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.ledger.lock().submitted.clone()
    }

    pub fn account_reads(&self) -> usize {
        self.ledger.lock().account_reads
    }

    pub fn status_lookups(&self) -> usize {
        self.ledger.lock().status_lookups
    }

    pub fn submission_attempts(&self) -> usize {
        self.ledger.lock().submission_attempts
    }
}

#[async_trait]
impl NetworkClient for MockNetwork {
    async fn get_account(&self, address: AccountAddress) -> Result<AccountInfo> {
        let mut ledger = self.ledger.lock();
        ledger.account_reads += 1;
        ledger
            .accounts
            .get(&address)
            .map(|&sequence_number| AccountInfo { sequence_number })
            .ok_or(SdkError::AccountNotFound(address))
    }

    async fn ledger_info(&self) -> Result<LedgerInfo> {
        Ok(LedgerInfo {
            chain_id: self.chain_id,
        })
    }

    async fn estimate_gas_price(&self) -> Result<u64> {
        Ok(self.gas_price)
    }

    async fn submit_signed_transaction(&self, txn: &SignedTransaction) -> Result<TransactionHash> {
        let mut ledger = self.ledger.lock();
        let attempt = ledger.submission_attempts;
        ledger.submission_attempts += 1;

        if let Some((kind, message)) = ledger.rejections.remove(&attempt) {
            return Err(SdkError::submission(kind, message));
        }

        let raw = txn.raw_transaction();
        if raw.chain_id != self.chain_id {
            return Err(SdkError::submission(SubmissionErrorKind::Rejected, "BAD_CHAIN_ID"));
        }
        txn.verify_signature()
            .map_err(|_| SdkError::submission(SubmissionErrorKind::Rejected, "INVALID_SIGNATURE"))?;

        let current = *ledger
            .accounts
            .get(&raw.sender)
            .ok_or_else(|| SdkError::submission(SubmissionErrorKind::Rejected, "SENDING_ACCOUNT_DOES_NOT_EXIST"))?;
        if raw.sequence_number < current {
            return Err(SdkError::submission(
                SubmissionErrorKind::StaleSequenceNumber,
                format!("SEQUENCE_NUMBER_TOO_OLD: have {}, account at {}", raw.sequence_number, current),
            ));
        }
        if raw.sequence_number > current {
            // a fullnode parks these in mempool; here they would never execute
            return Err(SdkError::submission(
                SubmissionErrorKind::StaleSequenceNumber,
                format!("SEQUENCE_NUMBER_TOO_NEW: have {}, account at {}", raw.sequence_number, current),
            ));
        }

        let hash = txn.committed_hash()?;
        let outcome = match &self.abort_with {
            Some(vm_status) => TerminalStatus::Failed {
                vm_status: vm_status.clone(),
            },
            None => TerminalStatus::Success {
                vm_status: "Executed successfully".into(),
            },
        };
        let polls_until_final = if self.finalize { self.pending_polls } else { usize::MAX };

        ledger.accounts.insert(raw.sender, current + 1);
        ledger.transactions.insert(
            hash.clone(),
            MockTransaction {
                polls_until_final,
                outcome,
            },
        );
        ledger.submitted.push(txn.clone());
        Ok(hash)
    }

    async fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<TransactionState> {
        let mut ledger = self.ledger.lock();
        ledger.status_lookups += 1;

        let Some(txn) = ledger.transactions.get_mut(hash) else {
            return Ok(TransactionState::NotFound);
        };
        if txn.polls_until_final > 0 {
            if txn.polls_until_final != usize::MAX {
                txn.polls_until_final -= 1;
            }
            return Ok(TransactionState::Pending);
        }
        Ok(TransactionState::Committed(txn.outcome.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        payload::create_game_payload,
        wallet::{LocalAccount, TestWallet, Wallet},
    };
    use std::sync::Arc;

    #[tokio::test]
    async fn test_stale_sequence_number_rejected() {
        let account = LocalAccount::generate();
        let network = Arc::new(MockNetwork::new().with_account(account.address(), 0));
        let wallet = TestWallet::new(account.clone(), network.clone());
        let call = create_game_payload(AccountAddress::ONE, "0x1::aptos_coin::AptosCoin", "g", 1, &[1], 1);

        let first = wallet.sign_transaction(&call).await.unwrap();
        let replay = first.clone();
        network.submit_signed_transaction(&first).await.unwrap();

        let err = network.submit_signed_transaction(&replay).await.unwrap_err();
        assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::StaleSequenceNumber));
    }

    #[tokio::test]
    async fn test_unknown_hash_not_found() {
        let network = MockNetwork::new();
        let state = network
            .transaction_by_hash(&TransactionHash::new("0xdead"))
            .await
            .unwrap();
        assert_eq!(state, TransactionState::NotFound);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let network = MockNetwork::new();
        assert!(matches!(
            network.get_account(AccountAddress::ONE).await,
            Err(SdkError::AccountNotFound(_))
        ));
    }
}
