use crate::{
    Result,
    app::{
        account_storage::AccountStorage,
        command_api::{
            Command,
            CommandAPI,
            PlaceBetCommand,
            Reply,
        },
    },
    dice::Die,
    engine::{
        EngineError,
        GameEngine,
    },
};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub mod account_storage;
pub mod actix_command_api;
pub mod command_api;
pub mod in_memory_account_storage;
pub mod sled_storage;


/// Owns the account for the whole process. Commands are executed strictly one after
/// another, so a bet's read-modify-write never interleaves with another operation.
pub struct App<API, Storage, D> {
    api: API,
    engine: GameEngine<Storage, D>,
    roll_delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Continue,
    Exit,
}

/// Resolves on ctrl-c, or on SIGTERM where that exists. The HTTP server does not
/// listen for signals itself, so this is the only shutdown trigger.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{
            SignalKind,
            signal,
        };
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::warn!("cannot listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = tokio::signal::ctrl_c() => match res {
            Ok(_) => tracing::info!("Received interrupt, exiting"),
            Err(_) => tracing::warn!("Received interrupt error, exiting anyway"),
        },
        _ = terminate => tracing::info!("Received SIGTERM, exiting"),
    }
}

pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

impl<API, Storage, D> App<API, Storage, D> {
    pub fn new(api: API, engine: GameEngine<Storage, D>, roll_delay: Duration) -> Self {
        Self {
            api,
            engine,
            roll_delay,
        }
    }
}

impl<API: CommandAPI, Storage: AccountStorage, D: Die> App<API, Storage, D> {
    pub async fn run(
        &mut self,
        interrupt: impl Future<Output = ()>,
    ) -> Result<RunState> {
        let command = tokio::select! {
            _ = interrupt => return Ok(RunState::Exit),
            command = self.api.next_command() => command?,
        };
        self.handle_command(command);
        Ok(RunState::Continue)
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::PlaceBet(PlaceBetCommand { request, reply }) => {
                let result = self.engine.place_bet(request);
                if result.is_ok() && !self.roll_delay.is_zero() {
                    // The account is already persisted; only the reply waits for the dice.
                    let delay = self.roll_delay;
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        respond(reply, result, "place bet");
                    });
                } else {
                    respond(reply, result, "place bet");
                }
            }
            Command::History(reply) => {
                respond(reply, self.engine.history(), "history");
            }
            Command::Withdraw(reply) => {
                respond(reply, self.engine.withdraw(), "withdraw");
            }
            Command::Reset(reply) => {
                respond(reply, self.engine.reset(), "reset");
            }
        }
    }
}

fn respond<T>(reply: Reply<T>, result: Result<T, EngineError>, operation: &str) {
    if reply.send(result).is_err() {
        tracing::warn!("{operation} requester went away before the reply was sent");
    }
}
