use anyhow::Context;
use casino::{
    app::{
        App,
        RunState,
        account_storage::AccountStorage,
        actix_command_api::ActixCommandApi,
        in_memory_account_storage::InMemoryAccountStorage,
        init_tracing,
        shutdown_signal,
        sled_storage::SledAccountStorage,
    },
    dice::ConfiguredDie,
    engine::GameEngine,
};
use clap::{
    Parser,
    ValueEnum,
};
use std::{
    fs,
    path::PathBuf,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DiceSource {
    /// OS-seeded thread RNG
    Thread,
    /// deterministic RNG from --dice-seed, replayable by anyone holding the seed
    Seeded,
}

#[derive(Parser, Debug)]
#[command(version, about = "Single-player dice casino backend", long_about = None)]
struct Args {
    #[arg(long, env = "CASINO_HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, env = "PORT", default_value_t = 5001)]
    port: u16,

    /// directory for the sled database
    #[arg(long, env = "CASINO_DATA_DIR", default_value = "casino_data")]
    data_dir: PathBuf,

    /// keep the account in memory only; it is lost on exit. --data-dir is ignored
    #[arg(long)]
    in_memory: bool,

    /// how long a bet reply is held back while the dice "roll"
    #[arg(long, default_value_t = 3000)]
    roll_delay_ms: u64,

    #[arg(long, value_enum, default_value_t = DiceSource::Thread)]
    dice: DiceSource,

    #[arg(long, required_if_eq("dice", "seeded"))]
    dice_seed: Option<u64>,
}

async fn serve<Storage: AccountStorage>(args: &Args, storage: Storage) -> anyhow::Result<()> {
    let die = match (args.dice, args.dice_seed) {
        (DiceSource::Seeded, Some(seed)) => {
            tracing::info!("Rolling with seeded dice (seed {seed})");
            ConfiguredDie::seeded(seed)
        }
        (DiceSource::Seeded, None) => {
            anyhow::bail!("--dice seeded requires --dice-seed");
        }
        (DiceSource::Thread, _) => ConfiguredDie::thread(),
    };
    let engine = GameEngine::bootstrap(storage, die)?;

    let roll_delay = Duration::from_millis(args.roll_delay_ms);
    let api = ActixCommandApi::new(&args.host, args.port).await?;
    let mut app = App::new(api, engine, roll_delay);

    tracing::info!("Starting casino service");
    loop {
        let interrupt = shutdown_signal();
        match app.run(interrupt).await? {
            RunState::Continue => continue,
            RunState::Exit => {
                tracing::info!("Exiting casino service");
                return Ok(());
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing();

    let result = if args.in_memory {
        tracing::warn!("Using in-memory storage; the account will not survive a restart");
        serve(&args, InMemoryAccountStorage::new()).await
    } else {
        fs::create_dir_all(&args.data_dir).with_context(|| {
            format!("creating data directory {}", args.data_dir.display())
        })?;
        tracing::info!("Using sled storage directory: {}", args.data_dir.display());
        let storage = SledAccountStorage::open(&args.data_dir)?;
        serve(&args, storage).await
    };
    if let Err(err) = &result {
        tracing::error!("casino service stopped: {err:#}");
    }
    result
}
