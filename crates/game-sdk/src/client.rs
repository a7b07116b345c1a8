//! node client
//!
//! `NetworkClient` is the seam to the ledger. `RestClient` talks to a
//! fullnode's REST api, `crate::mock::MockNetwork` keeps an in-memory ledger.

use crate::{
    config::{ClientConfig, DEFAULT_EXPIRATION_SECS, DEFAULT_MAX_GAS_AMOUNT},
    error::{Result, SdkError, SubmissionErrorKind},
    payload::CallDescription,
    types::{
        AccountAddress, RawTransaction, SignedTransaction, TerminalStatus, TransactionHash,
        TransactionPayload,
    },
};

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

const SIGNED_TRANSACTION_CONTENT_TYPE: &str = "application/x.aptos.signed_transaction+bcs";

/// on-chain account state we care about
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub sequence_number: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerInfo {
    pub chain_id: u8,
}

/// what the node knows about a transaction hash
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransactionState {
    /// not seen yet (or already evicted from mempool)
    NotFound,
    Pending,
    Committed(TerminalStatus),
}

/// overrides for transaction generation; `None` means fetch or default
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionOptions {
    pub sequence_number: Option<u64>,
    pub max_gas_amount: Option<u64>,
    pub gas_unit_price: Option<u64>,
    pub expiration_secs: Option<u64>,
}

impl TransactionOptions {
    pub fn with_sequence_number(mut self, sequence_number: u64) -> Self {
        self.sequence_number = Some(sequence_number);
        self
    }

    /// same options with the sequence number left to the account
    pub fn without_sequence_number(mut self) -> Self {
        self.sequence_number = None;
        self
    }
}

#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn get_account(&self, address: AccountAddress) -> Result<AccountInfo>;

    async fn ledger_info(&self) -> Result<LedgerInfo>;

    async fn estimate_gas_price(&self) -> Result<u64>;

    /// hand a signed transaction to the node; returns once accepted into mempool
    async fn submit_signed_transaction(&self, txn: &SignedTransaction) -> Result<TransactionHash>;

    async fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<TransactionState>;

    /// build an unsigned transaction for `call` sent by `sender`
    ///
    /// the call is validated and encoded before any request goes out
    async fn generate_transaction(
        &self,
        sender: AccountAddress,
        call: &CallDescription,
        options: TransactionOptions,
    ) -> Result<RawTransaction> {
        let entry = call.to_entry_function()?;

        let sequence_number = match options.sequence_number {
            Some(n) => n,
            None => self.get_account(sender).await?.sequence_number,
        };
        let gas_unit_price = match options.gas_unit_price {
            Some(p) => p,
            None => self.estimate_gas_price().await?,
        };
        let chain_id = self.ledger_info().await?.chain_id;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();

        Ok(RawTransaction {
            sender,
            sequence_number,
            payload: TransactionPayload::EntryFunction(entry),
            max_gas_amount: options.max_gas_amount.unwrap_or(DEFAULT_MAX_GAS_AMOUNT),
            gas_unit_price,
            expiration_timestamp_secs: now
                + options.expiration_secs.unwrap_or(DEFAULT_EXPIRATION_SECS),
            chain_id,
        })
    }
}

// ============================================================================
// REST CLIENT
// ============================================================================

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence_number: String,
}

#[derive(Debug, Deserialize)]
struct LedgerInfoResponse {
    chain_id: u8,
}

#[derive(Debug, Deserialize)]
struct GasEstimateResponse {
    gas_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct PendingTransactionResponse {
    hash: String,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    vm_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RestError {
    #[serde(default)]
    message: String,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    vm_error_code: Option<u64>,
}

/// fullnode REST api client
#[derive(Clone)]
pub struct RestClient {
    node_url: String,
    http: Client,
}

impl RestClient {
    pub fn new(node_url: &str, config: &ClientConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SdkError::Config(format!("http client: {}", e)))?;

        Ok(Self {
            node_url: node_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.node_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let err: RestError = response.json().await.unwrap_or_default();
            return Err(SdkError::Network(format!("GET {} -> {}: {}", path, status, err.message)));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl NetworkClient for RestClient {
    async fn get_account(&self, address: AccountAddress) -> Result<AccountInfo> {
        let path = format!("/accounts/{}", address);
        let url = format!("{}{}", self.node_url, path);
        debug!("GET {}", url);

        let response = self.http.get(&url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(SdkError::AccountNotFound(address));
        }
        if !response.status().is_success() {
            let status = response.status();
            let err: RestError = response.json().await.unwrap_or_default();
            return Err(SdkError::Network(format!("GET {} -> {}: {}", path, status, err.message)));
        }

        let account: AccountResponse = response.json().await?;
        let sequence_number = account.sequence_number.parse().map_err(|e| {
            SdkError::Encoding(format!("bad sequence number {:?}: {}", account.sequence_number, e))
        })?;
        Ok(AccountInfo { sequence_number })
    }

    async fn ledger_info(&self) -> Result<LedgerInfo> {
        let info: LedgerInfoResponse = self.get_json("/").await?;
        Ok(LedgerInfo {
            chain_id: info.chain_id,
        })
    }

    async fn estimate_gas_price(&self) -> Result<u64> {
        let estimate: GasEstimateResponse = self.get_json("/estimate_gas_price").await?;
        Ok(estimate.gas_estimate)
    }

    async fn submit_signed_transaction(&self, txn: &SignedTransaction) -> Result<TransactionHash> {
        let body = txn.to_bytes()?;
        let response = self
            .http
            .post(format!("{}/transactions", self.node_url))
            .header(CONTENT_TYPE, SIGNED_TRANSACTION_CONTENT_TYPE)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let pending: PendingTransactionResponse = response.json().await?;
            info!(
                "submitted transaction {} (sender {}, seq {})",
                pending.hash,
                txn.sender(),
                txn.sequence_number()
            );
            return Ok(TransactionHash::new(pending.hash));
        }

        let err: RestError = response.json().await.unwrap_or_default();
        Err(rejection(status, err))
    }

    async fn transaction_by_hash(&self, hash: &TransactionHash) -> Result<TransactionState> {
        let url = format!("{}/transactions/by_hash/{}", self.node_url, hash);
        let response = self.http.get(&url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(TransactionState::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status();
            let err: RestError = response.json().await.unwrap_or_default();
            return Err(SdkError::Network(format!("GET {} -> {}: {}", url, status, err.message)));
        }

        let txn: TransactionResponse = response.json().await?;
        Ok(transaction_state(txn))
    }
}

/// map a failed submission response onto an error
///
/// 5xx means the node could not process the request at all; anything else
/// is a rejection of the transaction itself, classified by `error_code`
/// first and by the message when the code is generic (`vm_error`)
fn rejection(status: StatusCode, err: RestError) -> SdkError {
    if status.is_server_error() {
        return SdkError::Network(format!("submit -> {}: {}", status, err.message));
    }

    let code = err.error_code.unwrap_or_default();
    let kind = match SubmissionErrorKind::classify(&code) {
        SubmissionErrorKind::Rejected => SubmissionErrorKind::classify(&err.message),
        kind => kind,
    };
    warn!(
        "transaction rejected ({}): {} [code={}, vm_error_code={:?}]",
        kind, err.message, code, err.vm_error_code
    );
    SdkError::submission(kind, err.message)
}

fn transaction_state(txn: TransactionResponse) -> TransactionState {
    if txn.kind == "pending_transaction" {
        return TransactionState::Pending;
    }

    let vm_status = txn.vm_status.unwrap_or_default();
    match txn.success {
        Some(true) => TransactionState::Committed(TerminalStatus::Success { vm_status }),
        Some(false) => TransactionState::Committed(TerminalStatus::Failed { vm_status }),
        // committed types always carry `success`; treat anything else as not final
        None => TransactionState::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        mock::MockNetwork,
        payload::create_game_payload,
        types::{AccountAddress, TypeTag},
    };

    fn parse(json: &str) -> TransactionState {
        transaction_state(serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_transaction_state_parsing() {
        assert_eq!(
            parse(r#"{"type":"pending_transaction","hash":"0x1"}"#),
            TransactionState::Pending
        );
        assert_eq!(
            parse(r#"{"type":"user_transaction","success":true,"vm_status":"Executed successfully"}"#),
            TransactionState::Committed(TerminalStatus::Success {
                vm_status: "Executed successfully".into()
            })
        );
        assert_eq!(
            parse(r#"{"type":"user_transaction","success":false,"vm_status":"Out of gas"}"#),
            TransactionState::Committed(TerminalStatus::Failed {
                vm_status: "Out of gas".into()
            })
        );
    }

    fn rejected(status: u16, json: &str) -> SdkError {
        let status = StatusCode::from_u16(status).unwrap();
        rejection(status, serde_json::from_str(json).unwrap())
    }

    #[test]
    fn test_rejection_classifies_node_errors() {
        let err = rejected(
            400,
            r#"{"message":"Invalid transaction: Type: Validation Code: SEQUENCE_NUMBER_TOO_OLD","error_code":"vm_error","vm_error_code":3}"#,
        );
        assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::StaleSequenceNumber));

        let err = rejected(
            400,
            r#"{"message":"Invalid transaction: Type: Validation Code: INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE","error_code":"vm_error","vm_error_code":5}"#,
        );
        assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::InsufficientBalance));

        let err = rejected(
            400,
            r#"{"message":"Invalid transaction: Type: Validation Code: MAX_GAS_UNITS_BELOW_MIN_TRANSACTION_GAS_UNITS","error_code":"vm_error","vm_error_code":14}"#,
        );
        assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::InsufficientGas));

        let err = rejected(
            413,
            r#"{"message":"transaction too large","error_code":"invalid_input","vm_error_code":null}"#,
        );
        assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::Rejected));
    }

    #[test]
    fn test_rejection_server_error_is_network() {
        let err = rejected(503, r#"{"message":"service unavailable","error_code":"internal_error"}"#);
        assert!(matches!(err, SdkError::Network(_)), "got {:?}", err);
        assert_eq!(err.submission_kind(), None);

        // unparseable bodies fall back to an empty RestError
        let err = rejection(StatusCode::BAD_GATEWAY, RestError::default());
        assert!(matches!(err, SdkError::Network(_)));
    }

    #[test]
    fn test_rest_client_trims_slash() {
        let client = RestClient::new("http://127.0.0.1:8080/v1/", &ClientConfig::default()).unwrap();
        assert_eq!(client.node_url(), "http://127.0.0.1:8080/v1");
    }

    #[tokio::test]
    async fn test_generate_transaction_fetches_state() {
        let sender: AccountAddress = "0xa11ce".parse().unwrap();
        let network = MockNetwork::new().with_account(sender, 9);
        let call = create_game_payload(AccountAddress::ONE, "0x1::aptos_coin::AptosCoin", "g", 1, &[1], 1);

        let raw = network
            .generate_transaction(sender, &call, TransactionOptions::default())
            .await
            .unwrap();

        assert_eq!(raw.sender, sender);
        assert_eq!(raw.sequence_number, 9);
        assert_eq!(raw.chain_id, network.chain_id());
        assert_eq!(raw.gas_unit_price, network.gas_price());
        assert_eq!(raw.max_gas_amount, DEFAULT_MAX_GAS_AMOUNT);

        let entry = raw.entry_function().unwrap();
        assert_eq!(entry.ty_args, vec!["0x1::aptos_coin::AptosCoin".parse::<TypeTag>().unwrap()]);
    }

    #[tokio::test]
    async fn test_generate_transaction_respects_overrides() {
        let sender: AccountAddress = "0xa11ce".parse().unwrap();
        let network = MockNetwork::new().with_account(sender, 9);
        let call = create_game_payload(AccountAddress::ONE, "0x1::aptos_coin::AptosCoin", "g", 1, &[1], 1);

        let options = TransactionOptions {
            sequence_number: Some(42),
            max_gas_amount: Some(5_000),
            gas_unit_price: Some(150),
            expiration_secs: None,
        };
        let raw = network.generate_transaction(sender, &call, options).await.unwrap();

        assert_eq!(raw.sequence_number, 42);
        assert_eq!(raw.max_gas_amount, 5_000);
        assert_eq!(raw.gas_unit_price, 150);
        assert_eq!(network.account_reads(), 0);
    }

    #[tokio::test]
    async fn test_generate_transaction_validates_before_io() {
        let sender: AccountAddress = "0xa11ce".parse().unwrap();
        let network = MockNetwork::new().with_account(sender, 0);
        let call = create_game_payload(AccountAddress::ONE, "not a type", "g", 1, &[1], 1);

        let err = network
            .generate_transaction(sender, &call, TransactionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, SdkError::Validation(_)));
        assert_eq!(network.account_reads(), 0);
    }

    #[tokio::test]
    #[ignore] // requires a reachable devnet fullnode
    async fn test_devnet_ledger_info() {
        let client = RestClient::new(crate::config::DEVNET_NODE_URL, &ClientConfig::default()).unwrap();
        let info = client.ledger_info().await.unwrap();
        assert!(info.chain_id > 0);
    }
}
