use crate::{
    account::Account,
    engine::{
        BetRequest,
        BetResolution,
        EngineError,
    },
};
use tokio::sync::oneshot;

pub type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

/// Source of the operations the app loop executes one at a time.
pub trait CommandAPI {
    fn next_command(&mut self) -> impl Future<Output = crate::Result<Command>>;
}

#[derive(Debug)]
pub enum Command {
    PlaceBet(PlaceBetCommand),
    History(Reply<Account>),
    Withdraw(Reply<u64>),
    Reset(Reply<u64>),
}

#[derive(Debug)]
pub struct PlaceBetCommand {
    pub request: BetRequest,
    pub reply: Reply<BetResolution>,
}

impl Command {
    pub fn place_bet(request: BetRequest, reply: Reply<BetResolution>) -> Self {
        Command::PlaceBet(PlaceBetCommand { request, reply })
    }
}
