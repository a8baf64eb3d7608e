use crate::{
    Result,
    account::{
        BetRecord,
        Outcome,
    },
    app::command_api::{
        Command,
        CommandAPI,
        Reply,
    },
    engine::{
        BetRequest,
        EngineError,
    },
};
use actix_cors::Cors;
use actix_web::{
    App,
    HttpResponse,
    HttpServer,
    ResponseError,
    dev::ServerHandle,
    http::StatusCode,
    web,
};
use anyhow::{
    Context,
    anyhow,
};
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    fmt,
    net::TcpListener,
    thread::JoinHandle,
};
use tokio::sync::{
    mpsc,
    oneshot,
};

const INVALID_BET: &str = "Invalid bet";
const NO_WINS_TO_WITHDRAW: &str = "No wins to withdraw";
const CANNOT_RESET: &str = "Cannot reset";
const INVALID_REQUEST: &str = "Invalid request";
const INTERNAL_SERVER_ERROR: &str = "Internal server error";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
struct BetRequestDto {
    amount: i64,
    number: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct BetResponseDto {
    balance: u64,
    #[serde(rename = "diceRoll")]
    dice_roll: u8,
    result: Outcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct HistoryResponseDto {
    balance: u64,
    history: Vec<BetRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct BalanceResponseDto {
    balance: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct ErrorResponseDto {
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    PlaceBet,
    History,
    Withdraw,
    Reset,
}

impl Operation {
    fn rejection_message(self) -> &'static str {
        match self {
            Operation::PlaceBet => INVALID_BET,
            Operation::Withdraw => NO_WINS_TO_WITHDRAW,
            Operation::Reset => CANNOT_RESET,
            Operation::History => INVALID_REQUEST,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::PlaceBet => "place bet",
            Operation::History => "history",
            Operation::Withdraw => "withdraw",
            Operation::Reset => "reset",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
enum ApiError {
    #[error("{message}: {reason}")]
    Rejected {
        message: &'static str,
        reason: String,
    },
    #[error("internal server error")]
    Internal,
}

impl ApiError {
    fn from_engine(operation: Operation, err: EngineError) -> Self {
        match err {
            EngineError::Rejected(rejection) => ApiError::Rejected {
                message: operation.rejection_message(),
                reason: rejection.to_string(),
            },
            EngineError::AccountMissing if operation == Operation::Reset => {
                ApiError::Rejected {
                    message: CANNOT_RESET,
                    reason: err.to_string(),
                }
            }
            other => {
                tracing::error!("{operation} failed: {other}");
                ApiError::Internal
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Rejected { .. } => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let body = match self {
            ApiError::Rejected { message, reason } => ErrorResponseDto {
                message: message.to_string(),
                reason: Some(reason.clone()),
            },
            ApiError::Internal => ErrorResponseDto {
                message: INTERNAL_SERVER_ERROR.to_string(),
                reason: None,
            },
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}

/// HTTP boundary. Requests become [`Command`]s that the app loop picks up through
/// [`CommandAPI::next_command`].
pub struct ActixCommandApi {
    receiver: mpsc::Receiver<Command>,
    base_url: String,
    server_handle: ServerHandle,
    server_thread: Option<JoinHandle<()>>,
}

impl ActixCommandApi {
    pub async fn new(host: &str, port: u16) -> Result<Self> {
        let (sender, receiver) = mpsc::channel(16);

        let listener = TcpListener::bind((host, port))
            .context("failed to bind HTTP listener for casino API")?;
        let address = listener
            .local_addr()
            .context("failed to read listener address")?;
        let base_url = format!("http://{}", address);

        tracing::info!("casino API listening on {}", base_url);

        let server = HttpServer::new(move || {
            App::new()
                .wrap(Cors::permissive())
                .app_data(web::Data::new(sender.clone()))
                .service(api_scope())
        })
        .disable_signals()
        .shutdown_timeout(5)
        .listen(listener)
        .context("failed to start Actix server")?
        .run();

        let server_handle = server.handle();
        let server_thread = std::thread::spawn(move || {
            let sys = actix_web::rt::System::new();
            let _ = sys.block_on(server);
        });

        Ok(Self {
            receiver,
            base_url,
            server_handle,
            server_thread: Some(server_thread),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl CommandAPI for ActixCommandApi {
    async fn next_command(&mut self) -> Result<Command> {
        self.receiver
            .recv()
            .await
            .ok_or_else(|| anyhow!("command server closed"))
    }
}

impl Drop for ActixCommandApi {
    fn drop(&mut self) {
        let _ = self.server_handle.stop(true);
        if let Some(thread) = self.server_thread.take() {
            let _ = thread.join();
        }
    }
}

fn api_scope() -> actix_web::Scope {
    let bet_json = web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Rejected {
            message: INVALID_BET,
            reason: err.to_string(),
        }
        .into()
    });
    web::scope("/api")
        .service(
            web::resource("/bet")
                .app_data(bet_json)
                .route(web::post().to(handle_place_bet)),
        )
        .route("/history", web::get().to(handle_history))
        .route("/withdraw", web::post().to(handle_withdraw))
        .route("/reset", web::post().to(handle_reset))
}

async fn forward<T>(
    sender: &mpsc::Sender<Command>,
    operation: Operation,
    command: impl FnOnce(Reply<T>) -> Command,
) -> Result<T, ApiError> {
    let (reply, response) = oneshot::channel();
    sender.send(command(reply)).await.map_err(|_| {
        tracing::error!("unable to forward {operation} command");
        ApiError::Internal
    })?;
    let result = response.await.map_err(|_| {
        tracing::error!("{operation} responder dropped");
        ApiError::Internal
    })?;
    result.map_err(|err| ApiError::from_engine(operation, err))
}

async fn handle_place_bet(
    sender: web::Data<mpsc::Sender<Command>>,
    body: web::Json<BetRequestDto>,
) -> Result<web::Json<BetResponseDto>, ApiError> {
    let BetRequestDto { amount, number } = body.into_inner();
    tracing::info!(amount, number, "received bet request");
    let request = BetRequest::new(amount, number);
    let resolution = forward(sender.get_ref(), Operation::PlaceBet, |reply| {
        Command::place_bet(request, reply)
    })
    .await?;
    Ok(web::Json(BetResponseDto {
        balance: resolution.balance,
        dice_roll: resolution.rolled_number,
        result: resolution.outcome,
    }))
}

async fn handle_history(
    sender: web::Data<mpsc::Sender<Command>>,
) -> Result<web::Json<HistoryResponseDto>, ApiError> {
    tracing::debug!("received history request");
    let account = forward(sender.get_ref(), Operation::History, Command::History).await?;
    Ok(web::Json(HistoryResponseDto {
        balance: account.balance,
        history: account.history,
    }))
}

async fn handle_withdraw(
    sender: web::Data<mpsc::Sender<Command>>,
) -> Result<web::Json<BalanceResponseDto>, ApiError> {
    tracing::info!("received withdraw request");
    let balance =
        forward(sender.get_ref(), Operation::Withdraw, Command::Withdraw).await?;
    Ok(web::Json(BalanceResponseDto { balance }))
}

async fn handle_reset(
    sender: web::Data<mpsc::Sender<Command>>,
) -> Result<web::Json<BalanceResponseDto>, ApiError> {
    tracing::info!("received reset request");
    let balance = forward(sender.get_ref(), Operation::Reset, Command::Reset).await?;
    Ok(web::Json(BalanceResponseDto { balance }))
}
