//! end-to-end create_game flows against the in-memory ledger

use game_sdk::{
    mock::MockNetwork, AccountAddress, ClientConfig, CreateGameParams, GameContract, LocalAccount,
    MoveValue, Network, NetworkProfile, SdkError, SubmissionErrorKind, TestWallet,
    Wallet,
};

use std::{sync::Arc, time::Duration};

const COIN: &str = "0x1::aptos_coin::AptosCoin";
const GAME: &str = "MyNewGame";
const AMOUNT: u64 = 100_000_000;
const FRACTIONS: [u64; 3] = [5555, 3000, 1445];
const JOIN_DURATION: u64 = 60 * 60 * 24 * 7;

struct Harness {
    network: Arc<MockNetwork>,
    contract: GameContract,
    admin: AccountAddress,
}

fn config() -> ClientConfig {
    ClientConfig {
        wait_timeout: Duration::from_secs(10),
        poll_interval: Duration::from_millis(200),
        ..Default::default()
    }
}

fn harness(network: MockNetwork) -> Harness {
    let account = LocalAccount::generate();
    let admin = account.address();
    let network = Arc::new(network.with_account(admin, 0));
    let wallet = TestWallet::new(account, network.clone()).with_defaults(config().transaction_options());
    let contract = GameContract::from_parts(
        Network::Devnet.profile(),
        network.clone(),
        Arc::new(wallet),
        &config(),
    );
    Harness {
        network,
        contract,
        admin,
    }
}

fn params(name: &str) -> CreateGameParams {
    CreateGameParams {
        coin_type: COIN.into(),
        game_name: name.into(),
        amount_per_depositor: AMOUNT,
        withdrawal_fractions: FRACTIONS.to_vec(),
        join_duration_secs: JOIN_DURATION,
    }
}

#[tokio::test(start_paused = true)]
async fn test_create_game_end_to_end() {
    let h = harness(MockNetwork::new().with_pending_polls(2));

    let call = h.contract.create_game_payload(&params(GAME)).unwrap();
    assert_eq!(
        call.function_id(),
        format!("{}::core::create_game", h.contract.contract_address())
    );
    assert_eq!(call.type_arguments, vec![COIN.to_string()]);
    assert_eq!(
        call.arguments,
        vec![
            MoveValue::from(GAME),
            MoveValue::U64(AMOUNT),
            MoveValue::from(FRACTIONS.to_vec()),
            MoveValue::U64(JOIN_DURATION),
        ]
    );

    let hash = h
        .contract
        .create_game(COIN, GAME, AMOUNT, &FRACTIONS, JOIN_DURATION)
        .await
        .unwrap();

    assert!(!hash.is_empty());
    let submitted = h.network.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].committed_hash().unwrap(), hash);
    assert_eq!(submitted[0].sender(), h.admin);

    let entry = submitted[0].raw_transaction().entry_function().unwrap();
    assert_eq!(entry.module.address, h.contract.contract_address());
    assert_eq!(entry.module.name, "core");
    assert_eq!(entry.function, "create_game");
    assert_eq!(entry.args.len(), 4);

    assert_eq!(h.network.sequence_number(h.admin), Some(1));
}

#[tokio::test]
async fn test_stale_sequence_number_propagates_without_retry() {
    let h = harness(MockNetwork::new());
    h.network.reject_next_submission(SubmissionErrorKind::StaleSequenceNumber, "SEQUENCE_NUMBER_TOO_OLD");

    let err = h
        .contract
        .create_game(COIN, GAME, AMOUNT, &FRACTIONS, JOIN_DURATION)
        .await
        .unwrap_err();

    assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::StaleSequenceNumber));
    // one signature, one submission, nothing re-signed behind our back
    assert_eq!(h.network.submission_attempts(), 1);
    assert_eq!(h.network.account_reads(), 1);
    assert!(h.network.submitted().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_create_game_times_out() {
    let h = harness(MockNetwork::new().never_finalize());

    let err = h
        .contract
        .create_game(COIN, GAME, AMOUNT, &FRACTIONS, JOIN_DURATION)
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "expected timeout, got {:?}", err);
    // the transaction went out; only local waiting stopped
    assert_eq!(h.network.submitted().len(), 1);
}

#[tokio::test]
async fn test_on_chain_abort_is_submission_error() {
    let h = harness(MockNetwork::new().abort_execution("Move abort in 0x4723::core: 0x1"));

    let err = h
        .contract
        .create_game(COIN, GAME, AMOUNT, &FRACTIONS, JOIN_DURATION)
        .await
        .unwrap_err();

    assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::ExecutionFailed));
}

#[tokio::test]
async fn test_validation_errors_never_reach_the_wire() {
    let h = harness(MockNetwork::new());

    let err = h
        .contract
        .create_game("AptosCoin", GAME, AMOUNT, &FRACTIONS, JOIN_DURATION)
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::Validation(_)));

    let err = h
        .contract
        .create_game(COIN, "", AMOUNT, &FRACTIONS, JOIN_DURATION)
        .await
        .unwrap_err();
    assert!(matches!(err, SdkError::Validation(_)));

    assert_eq!(h.network.account_reads(), 0);
    assert_eq!(h.network.submission_attempts(), 0);
}

#[tokio::test]
async fn test_create_games_batch() {
    let h = harness(MockNetwork::new());
    h.network.set_sequence_number(h.admin, 12);

    let games: Vec<CreateGameParams> = ["a", "b", "c"].iter().map(|n| params(n)).collect();
    let hashes = h.contract.create_games(&games).await.unwrap();

    assert_eq!(hashes.len(), 3);
    let submitted = h.network.submitted();
    let seqs: Vec<u64> = submitted.iter().map(|t| t.sequence_number()).collect();
    assert_eq!(seqs, vec![12, 13, 14]);
    for (txn, hash) in submitted.iter().zip(&hashes) {
        assert_eq!(&txn.committed_hash().unwrap(), hash);
    }
    assert_eq!(h.network.sequence_number(h.admin), Some(15));
}

#[tokio::test]
async fn test_create_games_batch_reports_failing_index() {
    let h = harness(MockNetwork::new());
    h.network.reject_next_submission(SubmissionErrorKind::Rejected, "mempool_is_full");

    let games: Vec<CreateGameParams> = ["a", "b", "c"].iter().map(|n| params(n)).collect();
    let err = h.contract.create_games(&games).await.unwrap_err();

    match err {
        SdkError::BatchItem {
            index,
            submitted,
            source,
        } => {
            assert_eq!(index, 0);
            assert!(submitted.is_empty());
            assert!(matches!(
                *source,
                SdkError::Submission {
                    kind: SubmissionErrorKind::Rejected,
                    ..
                }
            ));
        }
        other => panic!("expected batch item error, got {:?}", other),
    }
    // sequence number read once for the whole batch
    assert_eq!(h.network.account_reads(), 1);
    assert_eq!(h.network.submission_attempts(), 1);
}

#[test]
fn test_custom_profile_keeps_interface() {
    let account = LocalAccount::generate();
    let network = Arc::new(MockNetwork::new());
    let profile = NetworkProfile::custom(
        "localnet",
        "http://127.0.0.1:8080/v1",
        "0xcafe".parse().unwrap(),
        "0x00",
    );
    let wallet: Arc<dyn Wallet> = Arc::new(TestWallet::new(account, network.clone()));
    let contract = GameContract::from_parts(profile, network, wallet, &ClientConfig::default());

    assert_eq!(contract.contract_address(), "0xcafe".parse::<AccountAddress>().unwrap());
    assert_eq!(contract.profile().name, "localnet");
}

#[tokio::test]
async fn test_create_games_keeps_hashes_submitted_before_failure() {
    let h = harness(MockNetwork::new());
    h.network.reject_submission(2, SubmissionErrorKind::InsufficientBalance, "INSUFFICIENT_BALANCE_FOR_TRANSACTION_FEE");

    let games: Vec<CreateGameParams> = ["a", "b", "c", "d"].iter().map(|n| params(n)).collect();
    let err = h.contract.create_games(&games).await.unwrap_err();

    assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::InsufficientBalance));
    let accepted: Vec<_> = h
        .network
        .submitted()
        .iter()
        .map(|t| t.committed_hash().unwrap())
        .collect();
    assert_eq!(accepted.len(), 2);
    assert_eq!(err.submitted_hashes(), accepted.as_slice());
    match err {
        SdkError::BatchItem { index, .. } => assert_eq!(index, 2),
        other => panic!("expected batch item error, got {:?}", other),
    }
    // the first two still advanced the account on chain
    assert_eq!(h.network.sequence_number(h.admin), Some(2));
}

#[tokio::test]
async fn test_create_games_failure_while_awaiting_reports_all_hashes() {
    let h = harness(MockNetwork::new().abort_execution("Move abort in 0x4723::core: 0x1"));

    let games: Vec<CreateGameParams> = ["a", "b"].iter().map(|n| params(n)).collect();
    let err = h.contract.create_games(&games).await.unwrap_err();

    assert_eq!(err.submission_kind(), Some(SubmissionErrorKind::ExecutionFailed));
    assert_eq!(err.submitted_hashes().len(), 2);
}
