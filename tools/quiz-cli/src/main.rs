//! Quiz Battle command-line front-end.
//!
//! Talks to a wallet-enabled JSON-RPC endpoint (a dev node with unlocked
//! accounts) or runs a self-contained demo tournament against the
//! in-memory contract.
//!
//! ## Usage
//!
//! ```bash
//! # Show the current state (connecting registers the account if the lobby is open)
//! quiz-cli --rpc-url http://127.0.0.1:8545 status
//!
//! # Answer question 3
//! quiz-cli answer 3 VRF
//!
//! # Full four-player game, no node required
//! quiz-cli demo
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use quiz_sync::{
    Account, ChainClient, InMemoryQuizContract, JsonRpcChainClient, QuizBattleApi,
    QuizBattleClient, QuizClientConfig, QuizPhase, TxOutcome, Wei,
};
use quiz_telemetry::{encode_metrics, init_telemetry, TelemetryConfig};
use tracing::info;

/// Quiz Battle client
#[derive(Parser, Debug)]
#[command(name = "quiz-cli")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON-RPC endpoint URL (overrides QB_RPC_URL)
    #[arg(long)]
    rpc_url: Option<String>,

    /// Quiz contract address (overrides QB_CONTRACT_ADDRESS)
    #[arg(long)]
    contract: Option<Account>,

    /// Organizer address (overrides QB_ORGANIZER_ADDRESS)
    #[arg(long)]
    organizer: Option<Account>,

    /// Print Prometheus metrics before exiting
    #[arg(long)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Connect and print the current view
    Status,
    /// Print the view every time it changes
    Watch {
        /// Stop after this many seconds (runs until Ctrl-C otherwise)
        #[arg(long)]
        seconds: Option<u64>,
    },
    /// Register the connected account
    Register,
    /// Submit an answer
    Answer {
        /// Question id
        question: u64,
        /// Answer text, submitted verbatim
        answer: String,
    },
    /// Read the connected account's score
    Score,
    /// Start the quiz (organizer)
    Start,
    /// Declare winners (organizer)
    Declare,
    /// Reset the tournament (organizer)
    Reset,
    /// Distribute payouts (organizer)
    Payout,
    /// Add funds to the prize pool
    Fund {
        /// Amount in ETH, e.g. 0.5
        amount: String,
    },
    /// Play a four-player game against an in-memory contract
    Demo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let telemetry = TelemetryConfig::from_env();
    let _guard = init_telemetry(&telemetry).context("failed to initialise telemetry")?;

    let mut config = QuizClientConfig::from_env().context("invalid client configuration")?;
    if let Some(url) = args.rpc_url {
        config.rpc_url = url;
    }
    if let Some(contract) = args.contract {
        config.contract_address = contract;
    }
    if let Some(organizer) = args.organizer {
        config.organizer_address = organizer;
    }

    match args.command {
        Command::Demo => run_demo(config).await?,
        command => run_remote(config, command).await?,
    }

    if args.metrics {
        println!("{}", encode_metrics()?);
    }
    Ok(())
}

async fn run_remote(config: QuizClientConfig, command: Command) -> Result<()> {
    let chain = JsonRpcChainClient::new(
        config.rpc_url.clone(),
        config.contract_address,
        config.receipt_poll_interval,
    );
    let client = QuizBattleClient::new(Arc::new(chain), config)?;

    let account = client.connect().await.context("wallet connection failed")?;
    info!(account = %account, "Connected");

    match command {
        Command::Status => {}
        Command::Watch { seconds } => watch_view(&client, seconds.map(Duration::from_secs)).await?,
        Command::Register => report(client.register().await?),
        Command::Answer { question, answer } => {
            report(client.submit_answer(question, &answer).await?)
        }
        Command::Score => println!("Score: {}", client.fetch_score().await?),
        Command::Start => report(client.start_quiz().await?),
        Command::Declare => report(client.declare_winners().await?),
        Command::Reset => report(client.reset_tournament().await?),
        Command::Payout => report(client.distribute_payouts().await?),
        Command::Fund { amount } => {
            let amount = Wei::parse_ether(&amount)?;
            report(client.fund_prize_pool(amount).await?)
        }
        Command::Demo => bail!("the demo runs without a node"),
    }

    print!("{}", client.view());
    client.disconnect().await;
    Ok(())
}

fn report(outcome: TxOutcome) {
    println!("{} confirmed in {}", outcome.operation, outcome.hash);
    for winner in outcome.winners() {
        println!("  winner {} receives {}", winner.account, winner.reward);
    }
}

async fn watch_view(client: &QuizBattleClient, limit: Option<Duration>) -> Result<()> {
    let mut updates = client.subscribe();
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    print!("{}", client.view());
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("----");
                print!("{}", client.view());
            }
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl-C, stopping");
                break;
            }
        }
    }
    Ok(())
}

async fn wait_for_phase(client: &QuizBattleClient, phase: QuizPhase) -> Result<()> {
    let mut updates = client.subscribe();
    tokio::time::timeout(
        Duration::from_secs(30),
        updates.wait_for(|snapshot| snapshot.phase == phase),
    )
    .await
    .with_context(|| format!("quiz never reached {phase:?}"))??;
    Ok(())
}

async fn run_demo(mut config: QuizClientConfig) -> Result<()> {
    let organizer = config.organizer_address;
    config.participants_interval = Duration::from_millis(500);
    config.phase_interval = Duration::from_millis(250);
    config.prize_pool_interval = Duration::from_millis(350);
    config.countdown = Duration::from_secs(3);

    let contract = InMemoryQuizContract::new(organizer);
    let chain: Arc<dyn ChainClient> = Arc::new(contract.clone());
    let client = QuizBattleClient::new(chain, config)?;

    let players: Vec<Account> = (1..=4u8).map(|b| Account::new([b; 20])).collect();
    // Scores 3, 2, 1 and 0.
    let answers = [
        ("Manage payouts", "Remix", "VRF"),
        ("Manage payouts", "Hardhat", "VRF"),
        ("Hold NFTs", "Remix", "Functions"),
        ("Stake ETH", "Truffle", "Data Feeds"),
    ];

    for player in &players {
        contract.select_account(*player);
        if client.account().is_none() {
            client.connect().await?;
        } else {
            client.switch_account(*player).await?;
        }
        println!("{} joined", player.short());
    }

    println!("Lobby full, waiting for the countdown...");
    wait_for_phase(&client, QuizPhase::InProgress).await?;
    print!("{}", client.view());

    for (player, (a1, a2, a3)) in players.iter().zip(answers) {
        contract.select_account(*player);
        client.switch_account(*player).await?;
        for (question, answer) in [(1, a1), (2, a2), (3, a3)] {
            client.submit_answer(question, answer).await?;
        }
        println!("{} scored {}", player.short(), client.fetch_score().await?);
    }

    contract.select_account(organizer);
    client.switch_account(organizer).await?;
    if !client.is_organizer() {
        bail!("{} is not the configured organizer", organizer);
    }
    report(client.fund_prize_pool(Wei::parse_ether("1")?).await?);
    report(client.declare_winners().await?);
    report(client.distribute_payouts().await?);

    wait_for_phase(&client, QuizPhase::Ended).await?;
    print!("{}", client.view());
    for player in &players {
        println!(
            "{} balance {}",
            player.short(),
            Wei(contract.balance_of(player))
        );
    }

    client.disconnect().await;
    Ok(())
}
