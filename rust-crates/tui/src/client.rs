use crate::{
    casino_client::{
        BetOutcome,
        BetResult,
        CasinoClient,
        History,
        HistoryEntry,
        Rejected,
    },
    ui,
};
use color_eyre::eyre::{
    Report,
    Result,
    WrapErr,
    eyre,
};
use std::time::Duration;
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5001";
pub const STARTING_BALANCE: u64 = 1000;
const LOG_FILE_NAME: &str = "casino-tui.log";
const DICE_TICK: Duration = Duration::from_millis(120);

pub const PROMPT_MESSAGE: &str = "PLACE YOUR BET TO SEE THE RESULT.";
pub const WIN_MESSAGE: &str = "YOU WIN! WANT TO PUSH YOUR LUCK AGAIN?";
pub const LOSE_MESSAGE: &str = "YOU LOSE. TRY AGAIN!";

pub const AMOUNT_NOT_POSITIVE: &str = "Bet amount must be greater than zero.";
pub const AMOUNT_OVER_BALANCE: &str = "Sorry, you cannot bet more than your balance.";
pub const NUMBER_OUT_OF_RANGE: &str = "Please select a valid dice number (1-6).";
pub const ROLLING_MESSAGE: &str = "Rolling dice...";
pub const NO_WINS_MESSAGE: &str = "You must win at least one game before withdrawing.";
pub const WITHDRAWN_MESSAGE: &str = "Successfully withdrew your winnings.";
const GAME_OVER_MESSAGE: &str = "Game over. Press r to start a new game.";
const BUSY_MESSAGE: &str = "Still waiting on the casino...";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server_url: String,
    pub log_to_file: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server_url: DEFAULT_SERVER_URL.to_string(),
            log_to_file: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusLine {
    pub text: String,
    pub tone: Tone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Bet,
    History,
    Withdraw,
    Reset,
}

impl Action {
    fn failure_message(self) -> &'static str {
        match self {
            Action::Bet => "An error occurred while placing the bet.",
            Action::History => "Failed to fetch history.",
            Action::Withdraw => "Cannot withdraw right now.",
            Action::Reset => "Failed to reset the game.",
        }
    }
}

/// A bet that passed the client-side checks and can be sent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BetInput {
    pub amount: i64,
    pub number: i64,
}

/// Everything the screen shows that comes from the casino.
#[derive(Clone, Debug)]
pub struct Game {
    pub balance: u64,
    pub dice_roll: Option<u8>,
    pub outcome: Option<BetOutcome>,
    /// oldest first
    pub history: Vec<HistoryEntry>,
    pub status: Option<StatusLine>,
    pub withdrawn: bool,
    pending: Option<Action>,
    spinner_face: u8,
}

impl Default for Game {
    fn default() -> Self {
        Game {
            balance: STARTING_BALANCE,
            dice_roll: None,
            outcome: None,
            history: Vec::new(),
            status: None,
            withdrawn: false,
            pending: None,
            spinner_face: 1,
        }
    }
}

impl Game {
    pub fn result_message(&self) -> &'static str {
        match self.outcome {
            Some(BetOutcome::Win) => WIN_MESSAGE,
            Some(BetOutcome::Lose) => LOSE_MESSAGE,
            None => PROMPT_MESSAGE,
        }
    }

    pub fn is_rolling(&self) -> bool {
        self.pending == Some(Action::Bet)
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// The face to show in the dice panel, cycling while a bet is in flight.
    pub fn shown_face(&self) -> Option<u8> {
        if self.is_rolling() {
            Some(self.spinner_face)
        } else {
            self.dice_roll
        }
    }

    pub fn can_bet(&self) -> bool {
        self.balance > 0 && !self.withdrawn
    }

    pub fn can_withdraw(&self) -> bool {
        self.balance > 0 && !self.withdrawn
    }

    pub fn history_newest_first(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter().rev()
    }

    pub fn tick(&mut self) {
        if self.is_rolling() {
            self.spinner_face = self.spinner_face % 6 + 1;
        }
    }

    pub fn validate_bet(&self, amount: i64, number: i64) -> Result<BetInput, &'static str> {
        if amount <= 0 {
            return Err(AMOUNT_NOT_POSITIVE);
        }
        if amount as u64 > self.balance {
            return Err(AMOUNT_OVER_BALANCE);
        }
        if !(1..=6).contains(&number) {
            return Err(NUMBER_OUT_OF_RANGE);
        }
        Ok(BetInput { amount, number })
    }

    /// Checks a bet and marks it in flight. `None` means nothing should be sent.
    pub fn begin_bet(&mut self, amount: i64, number: i64) -> Option<BetInput> {
        if self.is_busy() {
            self.info(BUSY_MESSAGE);
            return None;
        }
        if !self.can_bet() {
            self.info(GAME_OVER_MESSAGE);
            return None;
        }
        match self.validate_bet(amount, number) {
            Ok(bet) => {
                self.pending = Some(Action::Bet);
                self.info(ROLLING_MESSAGE);
                Some(bet)
            }
            Err(message) => {
                self.error(message);
                None
            }
        }
    }

    pub fn begin_withdraw(&mut self) -> bool {
        if self.is_busy() {
            self.info(BUSY_MESSAGE);
            return false;
        }
        if !self.can_withdraw() {
            self.info(GAME_OVER_MESSAGE);
            return false;
        }
        if !self.history.iter().any(|e| e.outcome == BetOutcome::Win) {
            self.error(NO_WINS_MESSAGE);
            return false;
        }
        self.pending = Some(Action::Withdraw);
        true
    }

    pub fn begin_reset(&mut self) -> bool {
        if self.is_busy() {
            self.info(BUSY_MESSAGE);
            return false;
        }
        self.pending = Some(Action::Reset);
        true
    }

    pub fn begin_history(&mut self) -> bool {
        if self.is_busy() {
            return false;
        }
        self.pending = Some(Action::History);
        true
    }

    pub fn apply(&mut self, event: WorkerEvent) {
        self.pending = None;
        match event {
            WorkerEvent::BetPlaced(result) => {
                self.balance = result.balance;
                self.dice_roll = Some(result.dice_roll);
                self.outcome = Some(result.outcome);
                self.status = None;
            }
            WorkerEvent::HistoryLoaded(history) => {
                self.balance = history.balance;
                self.history = history.entries;
            }
            WorkerEvent::Withdrawn(_) => {
                // the server restarts the account; this session is cashed out until reset
                self.balance = 0;
                self.dice_roll = None;
                self.outcome = None;
                self.history.clear();
                self.withdrawn = true;
                self.success(WITHDRAWN_MESSAGE);
            }
            WorkerEvent::ResetDone(balance) => {
                *self = Game {
                    balance,
                    ..Game::default()
                };
            }
            WorkerEvent::Failed { action, message } => {
                self.error(message);
                if action == Action::Bet {
                    self.spinner_face = 1;
                }
            }
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.set_status(text, Tone::Info);
    }

    fn success(&mut self, text: impl Into<String>) {
        self.set_status(text, Tone::Success);
    }

    fn error(&mut self, text: impl Into<String>) {
        self.set_status(text, Tone::Error);
    }

    fn set_status(&mut self, text: impl Into<String>, tone: Tone) {
        self.status = Some(StatusLine {
            text: text.into(),
            tone,
        });
    }
}

#[derive(Debug)]
pub enum WorkerCommand {
    PlaceBet(BetInput),
    FetchHistory,
    Withdraw,
    Reset,
    Shutdown,
}

#[derive(Debug)]
pub enum WorkerEvent {
    BetPlaced(BetResult),
    HistoryLoaded(History),
    Withdrawn(u64),
    ResetDone(u64),
    Failed { action: Action, message: String },
}

/// What to show for a failed request: the server's reason if it gave one.
pub fn failure_text(action: Action, err: &Report) -> String {
    match err.downcast_ref::<Rejected>() {
        Some(rejected) => rejected.to_string(),
        None => action.failure_message().to_string(),
    }
}

pub async fn casino_worker(
    casino: CasinoClient,
    mut cmd_rx: mpsc::UnboundedReceiver<WorkerCommand>,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
) -> Result<()> {
    while let Some(cmd) = cmd_rx.recv().await {
        let (action, outcome) = match cmd {
            WorkerCommand::PlaceBet(bet) => (
                Action::Bet,
                casino
                    .place_bet(bet.amount, bet.number)
                    .await
                    .map(WorkerEvent::BetPlaced),
            ),
            WorkerCommand::FetchHistory => (
                Action::History,
                casino.history().await.map(WorkerEvent::HistoryLoaded),
            ),
            WorkerCommand::Withdraw => (
                Action::Withdraw,
                casino.withdraw().await.map(WorkerEvent::Withdrawn),
            ),
            WorkerCommand::Reset => (
                Action::Reset,
                casino.reset().await.map(WorkerEvent::ResetDone),
            ),
            WorkerCommand::Shutdown => break,
        };
        let event = outcome.unwrap_or_else(|err| {
            warn!(?action, "casino request failed: {err:#}");
            WorkerEvent::Failed {
                action,
                message: failure_text(action, &err),
            }
        });
        event_tx
            .send(event)
            .map_err(|_| eyre!("casino event receiver dropped"))?;
    }
    Ok(())
}

/// Logs go to a daily file since the terminal belongs to the UI. Hold the guard until exit.
pub fn init_tracing(config: &AppConfig) -> Option<WorkerGuard> {
    if !config.log_to_file {
        return None;
    }
    let appender = tracing_appender::rolling::daily(".", LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    Some(guard)
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let casino = CasinoClient::new(config.server_url.clone())?;
    let mut ui_state = ui::UiState::default();

    info!("Starting UI against {}", casino.base_url());
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(casino, &mut ui_state).await;
    ui::terminal_exit()?;
    res
}

fn send(cmd_tx: &mpsc::UnboundedSender<WorkerCommand>, cmd: WorkerCommand) -> Result<()> {
    cmd_tx
        .send(cmd)
        .map_err(|_| eyre!("casino worker stopped"))
}

async fn run_loop(casino: CasinoClient, ui_state: &mut ui::UiState) -> Result<()> {
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(casino_worker(casino, cmd_rx, event_tx));
    let mut input_events = ui::input_event_stream();
    let mut ticker = time::interval(DICE_TICK);

    let mut game = Game::default();
    if game.begin_history() {
        send(&cmd_tx, WorkerCommand::FetchHistory)?;
    }
    ui::draw(ui_state, &game).wrap_err("initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                let Some(event) = maybe_event else {
                    warn!("casino worker channel closed");
                    break;
                };
                let bet_settled = matches!(event, WorkerEvent::BetPlaced(_));
                let reset_done = matches!(event, WorkerEvent::ResetDone(_));
                if let WorkerEvent::Failed { action, message } = &event {
                    error!(?action, "{message}");
                }
                game.apply(event);
                if bet_settled {
                    ui::clear_form(ui_state);
                    if game.begin_history() {
                        send(&cmd_tx, WorkerCommand::FetchHistory)?;
                    }
                }
                if reset_done {
                    ui::clear_form(ui_state);
                }
                ui::draw(ui_state, &game).wrap_err("draw after casino update failed")?;
            }
            _ = ticker.tick() => {
                if game.is_rolling() {
                    game.tick();
                    ui::draw(ui_state, &game).wrap_err("draw while rolling failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(&mut input_events) => {
                let Some(ev) = ui::interpret_event(ui_state, raw_ev?) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::SubmitBet { amount, number } => {
                        if let Some(bet) = game.begin_bet(amount, number) {
                            info!(amount = bet.amount, number = bet.number, "placing bet");
                            send(&cmd_tx, WorkerCommand::PlaceBet(bet))?;
                        }
                    }
                    ui::UserEvent::Withdraw => {
                        if game.begin_withdraw() {
                            send(&cmd_tx, WorkerCommand::Withdraw)?;
                        }
                    }
                    ui::UserEvent::Reset => {
                        if game.begin_reset() {
                            send(&cmd_tx, WorkerCommand::Reset)?;
                        }
                    }
                }
                ui::draw(ui_state, &game).wrap_err("draw after input failed")?;
            }
        }
    }

    let _ = cmd_tx.send(WorkerCommand::Shutdown);
    match worker.await {
        Ok(res) => res,
        Err(err) => Err(eyre!("casino worker panicked: {err}")),
    }
}
