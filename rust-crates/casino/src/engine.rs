//! Bet resolution and the balance/history rules.
//!
//! The free functions decide everything against an in-memory [`Account`]; the
//! [`GameEngine`] wraps them with a load from and a save to the account storage.

use crate::{
    account::{
        Account,
        BetRecord,
        HIGHEST_FACE,
        LOWEST_FACE,
        Outcome,
    },
    app::account_storage::AccountStorage,
    dice::Die,
};
use anyhow::Context;
use chrono::{
    DateTime,
    Utc,
};

/// A win pays this many times the stake on top of keeping it.
pub const WIN_MULTIPLIER: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("bet amount must be greater than zero")]
    NonPositiveAmount,
    #[error("cannot bet more than balance")]
    InsufficientBalance,
    #[error("number must be 1-6")]
    NumberOutOfRange,
    #[error("no wins to withdraw")]
    NoWinsToWithdraw,
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Rejected(#[from] Rejection),
    #[error("account record not found")]
    AccountMissing,
    #[error("account store unavailable: {0:#}")]
    StoreUnavailable(anyhow::Error),
}

impl EngineError {
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            EngineError::Rejected(rejection) => Some(*rejection),
            _ => None,
        }
    }
}

/// A bet as the player asked for it, before any validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetRequest {
    pub amount: i64,
    pub number: i64,
}

impl BetRequest {
    pub fn new(amount: i64, number: i64) -> Self {
        Self { amount, number }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedBet {
    amount: u64,
    chosen_number: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBet {
    record: BetRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetResolution {
    pub balance: u64,
    pub rolled_number: u8,
    pub outcome: Outcome,
}

/// Checks amount, then balance, then number. The first failing check is reported.
pub fn validate_bet(balance: u64, request: BetRequest) -> Result<ValidatedBet, Rejection> {
    if request.amount <= 0 {
        return Err(Rejection::NonPositiveAmount);
    }
    let amount = request.amount.unsigned_abs();
    if amount > balance {
        return Err(Rejection::InsufficientBalance);
    }
    let chosen_number = u8::try_from(request.number)
        .ok()
        .filter(|number| (LOWEST_FACE..=HIGHEST_FACE).contains(number))
        .ok_or(Rejection::NumberOutOfRange)?;
    Ok(ValidatedBet {
        amount,
        chosen_number,
    })
}

impl ValidatedBet {
    pub fn amount(&self) -> u64 {
        self.amount
    }

    pub fn chosen_number(&self) -> u8 {
        self.chosen_number
    }

    pub fn resolve(self, die: &mut impl Die, placed_at: DateTime<Utc>) -> ResolvedBet {
        let rolled_number = die.roll();
        ResolvedBet {
            record: BetRecord {
                amount: self.amount,
                chosen_number: self.chosen_number,
                rolled_number,
                outcome: Outcome::of(self.chosen_number, rolled_number),
                placed_at,
            },
        }
    }
}

impl ResolvedBet {
    pub fn record(&self) -> &BetRecord {
        &self.record
    }

    /// Pays out or collects the stake and appends the record.
    pub fn apply(self, account: &mut Account) -> BetResolution {
        let record = self.record;
        account.balance = match record.outcome {
            Outcome::Win => account
                .balance
                .saturating_add(record.amount.saturating_mul(WIN_MULTIPLIER)),
            Outcome::Lose => account.balance.saturating_sub(record.amount),
        };
        let resolution = BetResolution {
            balance: account.balance,
            rolled_number: record.rolled_number,
            outcome: record.outcome,
        };
        account.history.push(record);
        resolution
    }
}

pub fn place_bet(
    account: &mut Account,
    request: BetRequest,
    die: &mut impl Die,
    placed_at: DateTime<Utc>,
) -> Result<BetResolution, Rejection> {
    let bet = validate_bet(account.balance, request)?;
    Ok(bet.resolve(die, placed_at).apply(account))
}

pub fn withdraw(account: &mut Account) -> Result<u64, Rejection> {
    if !account.has_win() {
        return Err(Rejection::NoWinsToWithdraw);
    }
    account.restart();
    Ok(account.balance)
}

pub fn reset(account: &mut Account) -> u64 {
    account.restart();
    account.balance
}

pub struct GameEngine<Storage, D> {
    storage: Storage,
    die: D,
}

impl<Storage, D> GameEngine<Storage, D> {
    pub fn new(storage: Storage, die: D) -> Self {
        Self { storage, die }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl<Storage: AccountStorage, D: Die> GameEngine<Storage, D> {
    /// Builds the engine and makes sure the account exists. Nothing can be served
    /// without it, so callers treat an error here as fatal.
    pub fn bootstrap(storage: Storage, die: D) -> crate::Result<Self> {
        let mut engine = Self::new(storage, die);
        engine
            .ensure_account()
            .context("initializing the casino account")?;
        Ok(engine)
    }

    /// Creates the account with the starting balance unless one is already stored.
    pub fn ensure_account(&mut self) -> crate::Result<Account> {
        if let Some(account) = self.storage.load_account()? {
            tracing::info!(
                "Account already exists with balance {} and {} bets",
                account.balance,
                account.history.len()
            );
            return Ok(account);
        }
        let account = Account::default();
        self.storage.save_account(&account)?;
        tracing::info!("Default account created with balance {}", account.balance);
        Ok(account)
    }

    pub fn place_bet(&mut self, request: BetRequest) -> Result<BetResolution, EngineError> {
        let mut account = self.load()?;
        let resolution = place_bet(&mut account, request, &mut self.die, Utc::now())
            .inspect_err(|rejection| {
                tracing::debug!(
                    amount = request.amount,
                    number = request.number,
                    "bet rejected: {rejection}"
                );
            })?;
        self.persist(&account)?;
        tracing::info!(
            amount = request.amount,
            chosen = request.number,
            rolled = resolution.rolled_number,
            outcome = ?resolution.outcome,
            balance = resolution.balance,
            "bet resolved"
        );
        Ok(resolution)
    }

    pub fn history(&self) -> Result<Account, EngineError> {
        self.load()
    }

    pub fn withdraw(&mut self) -> Result<u64, EngineError> {
        let mut account = match self.load() {
            Err(EngineError::AccountMissing) => {
                return Err(Rejection::NoWinsToWithdraw.into());
            }
            other => other?,
        };
        let balance = withdraw(&mut account).inspect_err(|rejection| {
            tracing::debug!("withdraw rejected: {rejection}");
        })?;
        self.persist(&account)?;
        tracing::info!(balance, "winnings withdrawn, account restarted");
        Ok(balance)
    }

    pub fn reset(&mut self) -> Result<u64, EngineError> {
        let mut account = self.load()?;
        let balance = reset(&mut account);
        self.persist(&account)?;
        tracing::info!(balance, "account reset");
        Ok(balance)
    }

    fn load(&self) -> Result<Account, EngineError> {
        self.storage
            .load_account()
            .map_err(EngineError::StoreUnavailable)?
            .ok_or(EngineError::AccountMissing)
    }

    fn persist(&mut self, account: &Account) -> Result<(), EngineError> {
        self.storage
            .save_account(account)
            .map_err(EngineError::StoreUnavailable)
    }
}
