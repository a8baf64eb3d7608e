use crate::{
    account::Account,
    app::{
        App,
        RunState,
        account_storage::AccountStorage,
        actix_command_api::ActixCommandApi,
        in_memory_account_storage::InMemoryAccountStorage,
    },
    dice::Die,
    engine::GameEngine,
};
use std::{
    future::pending,
    time::Duration,
};
use tokio::task::JoinHandle;

/// Rolls the given faces in order, starting over once they run out.
#[derive(Debug, Clone)]
pub struct ScriptedDie {
    rolls: Vec<u8>,
    next: usize,
}

impl ScriptedDie {
    pub fn new(rolls: impl IntoIterator<Item = u8>) -> Self {
        let rolls: Vec<u8> = rolls.into_iter().collect();
        assert!(!rolls.is_empty(), "scripted die needs at least one roll");
        Self { rolls, next: 0 }
    }
}

impl Die for ScriptedDie {
    fn roll(&mut self) -> u8 {
        let face = self.rolls[self.next % self.rolls.len()];
        self.next += 1;
        face
    }
}

/// Storage whose every call fails, as if the database were unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingAccountStorage;

impl AccountStorage for FailingAccountStorage {
    fn load_account(&self) -> crate::Result<Option<Account>> {
        Err(anyhow::anyhow!("account store unreachable"))
    }

    fn save_account(&mut self, _account: &Account) -> crate::Result<()> {
        Err(anyhow::anyhow!("account store unreachable"))
    }
}

/// A casino served on an ephemeral port, backed by in-memory storage.
pub struct TestCasino {
    base_url: String,
    storage: InMemoryAccountStorage,
    app_task: JoinHandle<()>,
}

impl TestCasino {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn account(&self) -> Option<Account> {
        self.storage
            .account()
            .lock()
            .expect("in-memory account lock poisoned")
            .clone()
    }
}

impl Drop for TestCasino {
    fn drop(&mut self) {
        self.app_task.abort();
    }
}

/// Starts the full stack (HTTP boundary, app loop, engine) with a scripted die and
/// no roll delay. Pass `None` to start without an account.
pub async fn spawn_test_casino(
    account: Option<Account>,
    rolls: impl IntoIterator<Item = u8>,
) -> TestCasino {
    spawn_test_casino_with_delay(account, rolls, Duration::ZERO).await
}

pub async fn spawn_test_casino_with_delay(
    account: Option<Account>,
    rolls: impl IntoIterator<Item = u8>,
    roll_delay: Duration,
) -> TestCasino {
    let storage = match account {
        Some(account) => InMemoryAccountStorage::new_with_account(account),
        None => InMemoryAccountStorage::new(),
    };
    let api = ActixCommandApi::new("127.0.0.1", 0)
        .await
        .expect("start casino API");
    let base_url = api.base_url().to_string();
    let engine = GameEngine::new(storage.clone(), ScriptedDie::new(rolls));
    let mut app = App::new(api, engine, roll_delay);
    let app_task = tokio::spawn(async move {
        while let Ok(RunState::Continue) = app.run(pending()).await {}
    });
    TestCasino {
        base_url,
        storage,
        app_task,
    }
}
