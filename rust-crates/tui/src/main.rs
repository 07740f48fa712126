use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use lootbox::{
    EmptyTierPolicy,
    Money,
    OpeningConfig,
    StoreConfig,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    sync::OnceLock,
};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod client;
mod ui;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(version, about = "Terminal lootbox storefront", long_about = None)]
struct Args {
    /// Starting balance in dollars, e.g. 250 or 99.95
    #[arg(long)]
    balance: Option<Money>,

    /// Load cases from a JSON catalog instead of the built-in one
    #[arg(long)]
    catalog: Option<PathBuf>,

    #[arg(long = "client-seed")]
    client_seed: Option<String>,

    /// Seed for the cosmetic reel shuffle and bot names
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long = "reveal-ms")]
    reveal_ms: Option<u64>,

    /// Use the shorter 50-slot reel
    #[arg(long)]
    quick: bool,

    /// Fall back to the first pool item when a rolled tier is empty
    #[arg(long = "legacy-fallback")]
    legacy_fallback: bool,

    #[arg(long = "log-dir", default_value = "logs")]
    log_dir: PathBuf,

    /// Sign in on start-up (email or display name)
    #[arg(long)]
    user: Option<String>,
}

impl Args {
    fn into_config(self) -> Result<client::AppConfig> {
        let mut store = StoreConfig::default();
        if self.quick {
            store.opening = OpeningConfig::quick();
        }
        if let Some(ms) = self.reveal_ms {
            store.opening.reveal_delay_ms = ms;
        }
        if self.legacy_fallback {
            store.empty_tier_policy = EmptyTierPolicy::FirstInPool;
        }
        if let Some(balance) = self.balance {
            store.starting_balance = balance;
        }
        store.validate().wrap_err("invalid store configuration")?;

        Ok(client::AppConfig {
            store,
            catalog_path: self.catalog,
            client_seed: self.client_seed,
            rng_seed: self.seed,
            user: self.user,
        })
    }
}

fn init_tracing(log_dir: &Path) {
    let appender = rolling::daily(log_dir, "lootbox-tui.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let _ = LOG_GUARD.set(guard);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    init_tracing(&args.log_dir);
    tracing::info!("starting lootbox storefront");
    let app_config = args.into_config()?;
    client::run_app(app_config).await
}
