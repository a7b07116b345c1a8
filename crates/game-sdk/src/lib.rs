//! game-sdk: client library for the on-chain game contract
//!
//! provides:
//! - call descriptions for `<contract>::core::create_game`
//! - wallets that sign single transactions and sequence-numbered batches
//! - submission with bounded waiting for terminal status
//! - a REST node client, a faucet client and an in-memory ledger for tests
//!   (`mock` feature)
//!
//! ## flow
//!
//! ```text
//! GameContract::create_game
//!     └─ create_game_payload      (pure)
//!          └─ Wallet::sign_transaction
//!               └─ NetworkClient::generate_transaction + ed25519 signature
//!                    └─ TransactionSubmitter::submit + await_completion
//! ```
//!
//! ## usage
//!
//! ```rust,ignore
//! let contract = GameContract::new(Network::Devnet)?;
//! let hash = contract
//!     .create_game("0x1::aptos_coin::AptosCoin", "MyNewGame", 100_000_000, &[5555, 3000, 1445], 604_800)
//!     .await?;
//! ```

pub mod client;
pub mod config;
pub mod contract;
pub mod error;
pub mod faucet;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod payload;
pub mod submitter;
pub mod types;
pub mod wallet;

pub use client::*;
pub use config::*;
pub use contract::*;
pub use error::*;
pub use faucet::*;
pub use payload::*;
pub use submitter::*;
pub use types::*;
pub use wallet::*;
