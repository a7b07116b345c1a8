//! create-game: fund the admin account from the faucet and create one game
//!
//! defaults reproduce the devnet bootstrap: 10 APT of funding, a game named
//! `MyNewGame` with a 1 APT deposit, a 55.55/30/14.45 split and a one week
//! join window.

use anyhow::{bail, Context, Result};
use clap::Parser;
use game_sdk::{ClientConfig, FaucetClient, GameContract, Network, Wallet};
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "create-game")]
#[command(about = "fund the admin account and create a game on the contract", long_about = None)]
struct Args {
    /// network profile
    #[arg(long, env = "GAME_SDK_NETWORK", default_value = "devnet")]
    network: Network,

    /// override the profile's fullnode url
    #[arg(long, env = "GAME_SDK_NODE_URL")]
    node_url: Option<String>,

    /// override the profile's faucet url
    #[arg(long, env = "GAME_SDK_FAUCET_URL")]
    faucet_url: Option<String>,

    /// override the profile's admin key (hex)
    #[arg(long, env = "GAME_SDK_ADMIN_KEY", hide_env_values = true)]
    admin_key: Option<String>,

    /// amount requested from the faucet
    #[arg(long, default_value_t = 1_000_000_000)]
    fund_amount: u64,

    /// do not call the faucet
    #[arg(long)]
    skip_funding: bool,

    #[arg(long, default_value = "0x1::aptos_coin::AptosCoin")]
    coin_type: String,

    #[arg(long, default_value = "MyNewGame")]
    game_name: String,

    /// deposit per player in the coin's smallest unit
    #[arg(long, default_value_t = 100_000_000)]
    amount_per_depositor: u64,

    /// payout split, comma separated
    #[arg(long, value_delimiter = ',', default_value = "5555,3000,1445")]
    withdrawal_fractions: Vec<u64>,

    /// join window in seconds
    #[arg(long, default_value_t = 60 * 60 * 24 * 7)]
    join_duration: u64,

    /// pause after funding and after creation, in milliseconds
    #[arg(long, default_value_t = 2000)]
    settle_ms: u64,

    /// how long to wait for each transaction
    #[arg(long, default_value_t = 30)]
    wait_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "create_game=info,game_sdk=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut profile = args.network.profile();
    if let Some(url) = args.node_url {
        profile.node_url = url;
    }
    if let Some(url) = args.faucet_url {
        profile.faucet_url = Some(url);
    }
    if let Some(key) = args.admin_key {
        profile.admin_private_key = key;
    }

    let config = ClientConfig {
        wait_timeout: Duration::from_secs(args.wait_timeout_secs),
        ..Default::default()
    };

    info!("network: {}", profile.name);
    info!("node: {}", profile.node_url);
    info!("contract: {}", profile.contract_address);

    let contract = GameContract::with_config(profile.clone(), config.clone())
        .context("failed to set up contract client")?;
    let admin = contract.wallet().address();
    info!("admin: {}", admin);

    let settle = Duration::from_millis(args.settle_ms);

    if !args.skip_funding {
        let Some(faucet_url) = profile.faucet_url.as_deref() else {
            bail!("network {} has no faucet; pass --faucet-url or --skip-funding", profile.name);
        };
        let faucet = FaucetClient::new(faucet_url, contract.submitter().clone(), &config)?;
        faucet
            .fund_account(admin, args.fund_amount)
            .await
            .context("faucet funding failed")?;
        tokio::time::sleep(settle).await;
    }

    let tx_hash = contract
        .create_game(
            &args.coin_type,
            &args.game_name,
            args.amount_per_depositor,
            &args.withdrawal_fractions,
            args.join_duration,
        )
        .await
        .context("create_game failed")?;
    tokio::time::sleep(settle).await;

    println!("TxHash: {}", tx_hash);

    Ok(())
}
