#![allow(non_snake_case)]

use casino::{
    app::{
        App,
        RunState,
        actix_command_api::ActixCommandApi,
        sled_storage::SledAccountStorage,
    },
    engine::GameEngine,
    test_helpers::ScriptedDie,
};
use serde_json::{
    Value,
    json,
};
use std::{
    future::pending,
    path::Path,
    time::Duration,
};
use tempdir::TempDir;
use tokio::task::JoinHandle;

struct Server {
    base_url: String,
    task: JoinHandle<()>,
}

impl Server {
    async fn start(dir: &Path, rolls: Vec<u8>) -> Self {
        let storage = SledAccountStorage::open(dir).unwrap();
        let engine = GameEngine::bootstrap(storage, ScriptedDie::new(rolls)).unwrap();
        let api = ActixCommandApi::new("127.0.0.1", 0).await.unwrap();
        let base_url = api.base_url().to_string();
        let mut app = App::new(api, engine, Duration::ZERO);
        let task = tokio::spawn(async move {
            while let Ok(RunState::Continue) = app.run(pending()).await {}
        });
        Server { base_url, task }
    }

    async fn stop(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}

async fn history(base_url: &str) -> Value {
    reqwest::get(format!("{base_url}/api/history"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn restart__keeps_balance_and_history() {
    let dir = TempDir::new("casino-restart").unwrap();

    // given
    let server = Server::start(dir.path(), vec![3, 1]).await;
    let http = reqwest::Client::new();
    for number in [3, 3] {
        http.post(format!("{}/api/bet", server.base_url))
            .json(&json!({"amount": 100, "number": number}))
            .send()
            .await
            .unwrap();
    }
    let before = history(&server.base_url).await;
    server.stop().await;

    // when
    let server = Server::start(dir.path(), vec![1]).await;
    let after = history(&server.base_url).await;

    // then
    assert_eq!(before["balance"], 1400);
    assert_eq!(after, before);
    server.stop().await;
}

#[tokio::test]
async fn restart__after_reset__starts_fresh() {
    let dir = TempDir::new("casino-reset").unwrap();

    // given
    let server = Server::start(dir.path(), vec![2]).await;
    let http = reqwest::Client::new();
    http.post(format!("{}/api/bet", server.base_url))
        .json(&json!({"amount": 250, "number": 5}))
        .send()
        .await
        .unwrap();
    http.post(format!("{}/api/reset", server.base_url))
        .send()
        .await
        .unwrap();
    server.stop().await;

    // when
    let server = Server::start(dir.path(), vec![2]).await;

    // then
    assert_eq!(
        history(&server.base_url).await,
        json!({"balance": 1000, "history": []})
    );
    server.stop().await;
}
