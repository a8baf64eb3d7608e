use chrono::{
    DateTime,
    Utc,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use reqwest::StatusCode;
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};

#[derive(Clone)]
pub struct CasinoClient {
    base_url: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetResult {
    pub balance: u64,
    pub dice_roll: u8,
    pub outcome: BetOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub amount: u64,
    pub number: u8,
    pub dice_roll: u8,
    pub outcome: BetOutcome,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct History {
    pub balance: u64,
    /// oldest first, as the server stores it
    pub entries: Vec<HistoryEntry>,
}

/// The server refused the request. `reason` is the engine's explanation when given.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", shown_reason(.reason, .message))]
pub struct Rejected {
    pub message: String,
    pub reason: Option<String>,
}

fn shown_reason<'a>(reason: &'a Option<String>, message: &'a str) -> &'a str {
    reason.as_deref().unwrap_or(message)
}

impl CasinoClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .build()
            .wrap_err("failed to build HTTP client for casino")?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn place_bet(&self, amount: i64, number: i64) -> Result<BetResult> {
        let url = format!("{}/api/bet", self.base_url);
        let res = self
            .http
            .post(url)
            .json(&BetRequestDto { amount, number })
            .send()
            .await
            .wrap_err("casino request failed")?;
        let dto: BetResponseDto = Self::read_json(res, "placing bet").await?;
        Ok(dto.into())
    }

    pub async fn history(&self) -> Result<History> {
        let url = format!("{}/api/history", self.base_url);
        let res = self
            .http
            .get(url)
            .send()
            .await
            .wrap_err("casino request failed")?;
        let dto: HistoryDto = Self::read_json(res, "fetching history").await?;
        Ok(dto.into())
    }

    pub async fn withdraw(&self) -> Result<u64> {
        self.post_for_balance("withdraw").await
    }

    pub async fn reset(&self) -> Result<u64> {
        self.post_for_balance("reset").await
    }

    async fn post_for_balance(&self, path: &str) -> Result<u64> {
        let url = format!("{}/api/{}", self.base_url, path);
        let res = self
            .http
            .post(url)
            .send()
            .await
            .wrap_err("casino request failed")?;
        let dto: BalanceDto = Self::read_json(res, path).await?;
        Ok(dto.balance)
    }

    async fn read_json<T: DeserializeOwned>(
        res: reqwest::Response,
        action: &str,
    ) -> Result<T> {
        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .wrap_err("failed to read casino response body")?;
        if status == StatusCode::BAD_REQUEST {
            let dto: ErrorDto = serde_json::from_slice(&bytes)
                .wrap_err("invalid casino error payload")?;
            return Err(Rejected {
                message: dto.message,
                reason: dto.reason,
            }
            .into());
        }
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes);
            return Err(eyre!(
                "casino responded with {status} when {action}: {body}"
            ));
        }
        serde_json::from_slice(&bytes)
            .wrap_err_with(|| format!("invalid casino payload when {action}"))
    }
}

#[derive(Serialize)]
struct BetRequestDto {
    amount: i64,
    number: i64,
}

#[derive(Deserialize)]
struct BetResponseDto {
    balance: u64,
    #[serde(rename = "diceRoll")]
    dice_roll: u8,
    result: BetOutcome,
}

#[derive(Deserialize)]
struct HistoryDto {
    balance: u64,
    history: Vec<HistoryEntryDto>,
}

#[derive(Deserialize)]
struct HistoryEntryDto {
    amount: u64,
    number: u8,
    #[serde(rename = "diceRoll")]
    dice_roll: u8,
    result: BetOutcome,
    date: DateTime<Utc>,
}

#[derive(Deserialize)]
struct BalanceDto {
    balance: u64,
}

#[derive(Deserialize)]
struct ErrorDto {
    message: String,
    #[serde(default)]
    reason: Option<String>,
}

impl From<BetResponseDto> for BetResult {
    fn from(dto: BetResponseDto) -> Self {
        BetResult {
            balance: dto.balance,
            dice_roll: dto.dice_roll,
            outcome: dto.result,
        }
    }
}

impl From<HistoryEntryDto> for HistoryEntry {
    fn from(dto: HistoryEntryDto) -> Self {
        HistoryEntry {
            amount: dto.amount,
            number: dto.number,
            dice_roll: dto.dice_roll,
            outcome: dto.result,
            date: dto.date,
        }
    }
}

impl From<HistoryDto> for History {
    fn from(dto: HistoryDto) -> Self {
        History {
            balance: dto.balance,
            entries: dto.history.into_iter().map(Into::into).collect(),
        }
    }
}
