use chrono::{
    DateTime,
    Utc,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Balance the account starts with, and returns to on withdraw or reset.
pub const STARTING_BALANCE: u64 = 1000;

pub const LOWEST_FACE: u8 = 1;
pub const HIGHEST_FACE: u8 = 6;

#[derive(PartialEq, Eq, Debug, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Win,
    Lose,
}

impl Outcome {
    pub fn of(chosen_number: u8, rolled_number: u8) -> Self {
        if chosen_number == rolled_number {
            Outcome::Win
        } else {
            Outcome::Lose
        }
    }

    pub fn is_win(self) -> bool {
        matches!(self, Outcome::Win)
    }
}

// Field names match what the browser client and the stored history column expect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetRecord {
    pub amount: u64,
    #[serde(rename = "number")]
    pub chosen_number: u8,
    #[serde(rename = "diceRoll")]
    pub rolled_number: u8,
    #[serde(rename = "result")]
    pub outcome: Outcome,
    #[serde(rename = "date")]
    pub placed_at: DateTime<Utc>,
}

/// The one account the casino knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub balance: u64,
    pub history: Vec<BetRecord>,
}

impl Account {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_balance(balance: u64) -> Self {
        Self {
            balance,
            history: Vec::new(),
        }
    }

    pub fn has_win(&self) -> bool {
        self.history.iter().any(|record| record.outcome.is_win())
    }

    /// Back to the starting balance with an empty history.
    pub fn restart(&mut self) {
        self.balance = STARTING_BALANCE;
        self.history.clear();
    }
}

impl Default for Account {
    fn default() -> Self {
        Account::with_balance(STARTING_BALANCE)
    }
}
