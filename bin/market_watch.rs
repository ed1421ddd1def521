//! # Market Watch
//!
//! Read-only snapshot of one market for one account: positions, position
//! details, token balances and, optionally, a PT-out quote.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin market_watch -- --account 0x... --pool 0x... --quote 10
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use stellaris_market_sdk::{
    ledger::DisconnectedWallet, metrics, LogNotifier, MarketSession, QuoteKind, Settings,
    ViewClient,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "market_watch", about = "Snapshot a Stellaris market for an account")]
struct Args {
    /// Account address
    #[arg(long)]
    account: String,

    /// Market pool id (defaults to the first configured pool)
    #[arg(long)]
    pool: Option<String>,

    /// SY amount to quote PT output for
    #[arg(long)]
    quote: Option<f64>,

    /// Settings file
    #[arg(long, default_value = "Config.toml")]
    config: String,
}

fn init_telemetry() -> Result<()> {
    #[cfg(feature = "observability")]
    {
        tracing_subscriber::fmt().json().init();
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .install()
            .map_err(|e| anyhow!("Failed to install Prometheus exporter: {}", e))?;
        metrics::describe_metrics();
    }
    #[cfg(not(feature = "observability"))]
    {
        env_logger::init();
        metrics::describe_metrics();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_telemetry()?;

    let args = Args::parse();

    let settings = Settings::from_file(&args.config)?;
    let pool_id = match args.pool {
        Some(pool_id) => pool_id,
        None => settings
            .pools
            .first()
            .map(|pool| pool.pool_id.clone())
            .ok_or_else(|| anyhow!("No pools configured"))?,
    };

    let reader = Arc::new(ViewClient::new(settings.ledger.clone())?);
    let session = MarketSession::new(
        &settings,
        &pool_id,
        reader,
        Arc::new(DisconnectedWallet),
        Arc::new(LogNotifier),
    )?;
    let pool = session.pool().clone();
    println!("Market: {} ({})", pool.name, pool.pool_id);

    session.connect_account(Some(args.account.clone()));
    let (positions_outcome, balances_outcome) = session.mount().await;
    log::debug!(
        "mount: positions {:?}, balances {:?}",
        positions_outcome,
        balances_outcome
    );

    let positions = session.positions().data();
    println!("Positions: {}", positions.len());

    let mut details_rx = session.details().subscribe();
    session.sync_details().await;
    if !positions.is_empty() {
        let wait = Duration::from_secs(settings.ledger.request_timeout_seconds + 1);
        let loaded = tokio::time::timeout(
            wait,
            details_rx.wait_for(|view| !view.is_loading && view.updated_at.is_some()),
        )
        .await
        .is_ok();
        if !loaded {
            log::warn!("Timed out waiting for position details");
        }
    }
    for record in session.details().data() {
        println!(
            "  {}  {}  PT {}  YT {}  expires in {} days",
            record.id,
            record.description,
            record.pt_balance_display,
            record.yt_balance_display,
            record.expiry_days
        );
    }

    let balances = session.balances().data();
    println!("Balance {}: {}", pool.name, balances.underlying);
    println!("Balance SY-{}: {}", pool.name, balances.sy);

    if let Some(amount) = args.quote {
        match session
            .quotes()
            .compute(QuoteKind::PtOut, amount, &pool.py_state_id, &pool.pool_id)
            .await
        {
            Some(pt_out) => println!("Quote: {} SY -> {} PT", amount, pt_out),
            None => println!("Quote: unavailable for {}", amount),
        }
    }

    Ok(())
}
